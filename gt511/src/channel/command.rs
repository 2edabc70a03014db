use std::time::Duration;

use tracing::debug;

use gt511_core::{CommandPacket, Opcode, Packet};
use gt511_transport::Transport;

use super::{Awaiting, Channel};
use crate::error::{Error, Result};

impl<T: Transport> Channel<T> {
    /// Send a command and wait for its response
    ///
    /// Returns the response parameter on ACK. A NACK becomes
    /// [`Error::Nack`] carrying the device's reason code.
    pub async fn send_command(&mut self, command: Opcode, param: u32) -> Result<u16> {
        let timeout = self.response_timeout(command);
        self.exchange(command, param, timeout).await
    }

    /// Like [`Channel::send_command`], but give up after `limit` if that
    /// comes before the command's own timeout
    pub async fn send_command_within(
        &mut self,
        command: Opcode,
        param: u32,
        limit: Duration,
    ) -> Result<u16> {
        let timeout = self.response_timeout(command).min(limit);
        self.exchange(command, param, timeout).await
    }

    async fn exchange(&mut self, command: Opcode, param: u32, timeout: Duration) -> Result<u16> {
        self.begin(command, Awaiting::Response).await?;

        let frame = CommandPacket::new(command, param).encode();
        debug!(%command, param, "Sending command");

        if let Err(e) = self.transport.send(&frame).await {
            return self.settle(Err(e.into()));
        }

        let result = self.await_response(command, timeout).await;
        self.settle(result)
    }

    /// Wait for the response that settles `command`
    pub(super) async fn await_response(&mut self, command: Opcode, timeout: Duration) -> Result<u16> {
        let packet = self.next_packet(Awaiting::Response, timeout).await?;

        let response = match packet {
            Packet::Response(response) => response,
            other => {
                return Err(Error::InvalidResponse(format!(
                    "expected a response to {}, got a {} frame",
                    command,
                    other.kind()
                )));
            }
        };

        debug!(%command, %response, "Command settled");

        match response.nack_reason() {
            None => Ok(response.param),
            Some(reason) => Err(Error::Nack { command, reason }),
        }
    }
}
