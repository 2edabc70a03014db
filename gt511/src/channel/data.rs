use bytes::Bytes;
use tracing::debug;

use gt511_core::{DataPacket, Opcode, Packet};
use gt511_transport::Transport;

use super::{Awaiting, Channel};
use crate::error::{Error, Result};

impl<T: Transport> Channel<T> {
    /// Upload a data frame announced by `command`
    ///
    /// The sensor answers the upload with a response of its own, which is
    /// where template verification and identification report their
    /// outcome. Returns that response's parameter.
    pub async fn send_data(&mut self, command: Opcode, payload: &[u8]) -> Result<u16> {
        self.begin(command, Awaiting::Response).await?;

        let frame = DataPacket::new(Bytes::copy_from_slice(payload)).encode();
        debug!(%command, payload_len = payload.len(), "Sending data");

        if let Err(e) = self.transport.send(&frame).await {
            return self.settle(Err(e.into()));
        }

        let timeout = self.response_timeout(command);
        let result = self.await_response(command, timeout).await;
        self.settle(result)
    }

    /// Wait for the `frame_len` byte data frame announced by `command`
    ///
    /// `frame_len` includes the six bytes of framing. The expectation only
    /// lives for this call, and ends early if the frame arrives corrupt;
    /// after that, data frames are no longer recognised.
    pub async fn receive_data(&mut self, command: Opcode, frame_len: usize) -> Result<Bytes> {
        let awaiting = Awaiting::Data(frame_len);
        self.begin(command, awaiting).await?;

        let result = match self.next_packet(awaiting, self.data_timeout).await {
            Ok(Packet::Data(data)) => {
                debug!(%command, payload_len = data.payload.len(), "Data received");
                Ok(data.payload)
            }
            Ok(other) => Err(Error::InvalidResponse(format!(
                "expected data for {}, got a {} frame",
                command,
                other.kind()
            ))),
            Err(e) => Err(e),
        };

        self.settle(result)
    }

    /// Send a command whose positive answer is followed by a data frame
    pub async fn request_data(
        &mut self,
        command: Opcode,
        param: u32,
        frame_len: usize,
    ) -> Result<Bytes> {
        self.send_command(command, param).await?;
        self.receive_data(command, frame_len).await
    }

    /// Send a command and, once acknowledged, the data it announced
    pub async fn command_with_data(
        &mut self,
        command: Opcode,
        param: u32,
        payload: &[u8],
    ) -> Result<u16> {
        self.send_command(command, param).await?;
        self.send_data(command, payload).await
    }
}
