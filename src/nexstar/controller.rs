use super::error::ControllerError;
use super::types::{ControllerTime, Location, Model, Position, Version};
use crate::transport::{is_idle, Transport};

const TERMINATOR: u8 = b'#';

/// Command/response session with a telescope hand controller.
pub trait Controller {
    fn get_model(&mut self) -> Result<Model, ControllerError>;
    fn get_version(&mut self) -> Result<Version, ControllerError>;
    fn set_time(&mut self, time: &ControllerTime) -> Result<(), ControllerError>;
    fn set_location(&mut self, location: &Location) -> Result<(), ControllerError>;
    fn get_location(&mut self) -> Result<Location, ControllerError>;
    fn get_time(&mut self) -> Result<ControllerTime, ControllerError>;
    fn get_position(&mut self) -> Result<Position, ControllerError>;
}

/// Celestron NexStar serial protocol.
///
/// Every request is a command letter plus an optional binary payload;
/// every reply ends with `#`.
pub struct NexstarController<T> {
    transport: T,
}

impl<T: Transport> NexstarController<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send `command` + `payload` and return the reply without its terminator.
    fn exchange(&mut self, command: u8, payload: &[u8]) -> Result<Vec<u8>, ControllerError> {
        let mut request = Vec::with_capacity(1 + payload.len());
        request.push(command);
        request.extend_from_slice(payload);
        // A reply that showed up after an earlier timeout must not be read as ours.
        self.transport.clear_input()?;
        self.transport.write_all(&request)?;
        self.transport.flush()?;

        let mut reply = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.transport.read(&mut byte) {
                Ok(0) => return Err(ControllerError::bad_response(command, &reply)),
                Ok(_) if byte[0] == TERMINATOR => return Ok(reply),
                Ok(_) => {
                    reply.push(byte[0]);
                    // Longest reply is the 17-byte precise RA/DEC pair.
                    if reply.len() > 32 {
                        return Err(ControllerError::bad_response(command, &reply));
                    }
                }
                Err(e) if is_idle(&e) => {
                    return Err(ControllerError::Timeout {
                        command: command as char,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn exchange_exact<const N: usize>(
        &mut self,
        command: u8,
        payload: &[u8],
    ) -> Result<[u8; N], ControllerError> {
        let reply = self.exchange(command, payload)?;
        <[u8; N]>::try_from(reply.as_slice())
            .map_err(|_| ControllerError::bad_response(command, &reply))
    }
}

impl<T: Transport> Controller for NexstarController<T> {
    fn get_model(&mut self) -> Result<Model, ControllerError> {
        let [code] = self.exchange_exact::<1>(b'm', &[])?;
        Ok(Model::from(code))
    }

    fn get_version(&mut self) -> Result<Version, ControllerError> {
        let [major, minor] = self.exchange_exact::<2>(b'V', &[])?;
        Ok(Version { major, minor })
    }

    fn set_time(&mut self, time: &ControllerTime) -> Result<(), ControllerError> {
        let payload = time.to_bytes()?;
        self.exchange_exact::<0>(b'H', &payload)?;
        Ok(())
    }

    fn set_location(&mut self, location: &Location) -> Result<(), ControllerError> {
        let payload = location.to_bytes()?;
        self.exchange_exact::<0>(b'W', &payload)?;
        Ok(())
    }

    fn get_location(&mut self) -> Result<Location, ControllerError> {
        let reply = self.exchange_exact::<8>(b'w', &[])?;
        Ok(Location::from_bytes(&reply))
    }

    fn get_time(&mut self) -> Result<ControllerTime, ControllerError> {
        let reply = self.exchange_exact::<8>(b'h', &[])?;
        ControllerTime::from_bytes(&reply).ok_or_else(|| ControllerError::bad_response(b'h', &reply))
    }

    fn get_position(&mut self) -> Result<Position, ControllerError> {
        let reply = self.exchange(b'e', &[])?;
        parse_precise_pair(&reply)
            .map(|(ra, dec)| Position::from_fractions(ra, dec))
            .ok_or_else(|| ControllerError::bad_response(b'e', &reply))
    }
}

/// `RRRRRRRR,DDDDDDDD` as two hex words.
fn parse_precise_pair(reply: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(reply).ok()?;
    let (ra, dec) = text.split_once(',')?;
    Some((
        u32::from_str_radix(ra, 16).ok()?,
        u32::from_str_radix(dec, 16).ok()?,
    ))
}
