pub const START_BYTE: u8 = 0x01;
pub const STOP_BYTE: u8 = 0x7F;

// start bytes, id, length
const HEADER_LEN: usize = 5;
// checksum, stop byte
const TRAILER_LEN: usize = 5;

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::MinError;

const ISO_HDLC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinFrame {
    pub id: u8,
    pub payload: Vec<u8>,
}

impl MinFrame {
    pub fn new(id: u8, payload: &[u8]) -> Self {
        MinFrame { id, payload: payload.to_vec() }
    }

    pub fn encode(&self) -> Result<Vec<u8>, MinError> {
        encode_min(self.id, &self.payload)
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut digest = ISO_HDLC.digest();
    digest.update(bytes);
    digest.finalize()
}

// read the checksum that was written into the message
fn decode_cksum(msg_subbuffer: &[u8]) -> u32 {
    (msg_subbuffer[0] as u32) << 24 | (msg_subbuffer[1] as u32) << 16 | (msg_subbuffer[2] as u32) << 8 | (msg_subbuffer[3] as u32) << 0
}

/// Wrap `payload` in a MIN frame ready to write to the port.
pub fn encode_min(id: u8, payload: &[u8]) -> Result<Vec<u8>, MinError> {
    let len = u8::try_from(payload.len()).map_err(|_| MinError::PayloadTooLong(payload.len()))?;
    let mut msg = Vec::with_capacity(payload.len() + HEADER_LEN + TRAILER_LEN);
    msg.extend_from_slice(&[START_BYTE, START_BYTE, START_BYTE, id, len]);
    msg.extend_from_slice(payload);
    let cksum = checksum(&msg);
    msg.extend_from_slice(&cksum.to_be_bytes());
    msg.push(STOP_BYTE);
    Ok(msg)
}

/// Take in the bytes of one frame read from serial and decode it.
pub fn decode_min(msg: &[u8]) -> Result<MinFrame, MinError> {
    if msg.len() < HEADER_LEN + TRAILER_LEN {
        return Err(MinError::Length { expected: HEADER_LEN + TRAILER_LEN, actual: msg.len() });
    }
    for i in 0..3 {
        if msg[i] != START_BYTE { return Err(MinError::BadStart(i)) }
    }
    let id = msg[3];
    let msg_len = msg[4] as usize;

    if msg.len() != msg_len + HEADER_LEN + TRAILER_LEN {
        return Err(MinError::Length { expected: msg_len + HEADER_LEN + TRAILER_LEN, actual: msg.len() });
    }
    let stop = msg[msg.len() - 1];
    if stop != STOP_BYTE { return Err(MinError::BadStop(stop)) }

    let body_end = msg_len + HEADER_LEN;
    let reported = decode_cksum(&msg[body_end .. body_end + 4]);
    let calculated = checksum(&msg[.. body_end]);
    if reported != calculated {
        return Err(MinError::Checksum { reported, calculated });
    }

    Ok(MinFrame { id, payload: msg[HEADER_LEN .. body_end].to_vec() })
}

fn read_byte<R: Read>(port: &mut R) -> Result<Option<u8>, MinError> {
    let mut byte = [0; 1];
    match port.read(&mut byte) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(byte[0])),
        Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_exact<R: Read>(port: &mut R, buf: &mut [u8]) -> Result<(), MinError> {
    port.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::TimedOut => MinError::Timeout,
        _ => MinError::Io(e),
    })
}

/// Listen until one MIN frame arrives or `timeout` passes.
///
/// Bytes before three consecutive start bytes are discarded. The rest of the
/// frame is read by its length field, so payload bytes equal to the stop byte
/// are fine.
pub fn min_listen<R: Read>(port: &mut R, timeout: Duration) -> Result<MinFrame, MinError> {
    let start_time = Instant::now();
    let mut count = 0;
    while start_time.elapsed() < timeout {
        let Some(byte) = read_byte(port)? else { break };
        // count up to three start bytes in a row, which opens a frame
        if byte == START_BYTE {
            count += 1;
        } else {
            count = 0;
        }
        if count == 3 {
            let mut buffer = vec![START_BYTE; 3];
            let mut header = [0u8; 2];
            read_exact(port, &mut header)?;
            buffer.extend_from_slice(&header);
            let mut rest = vec![0u8; header[1] as usize + TRAILER_LEN];
            read_exact(port, &mut rest)?;
            buffer.extend_from_slice(&rest);
            return decode_min(&buffer);
        }
    }
    Err(MinError::Timeout)
}
