//! Append-only record log shared by the ledgers.

use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a symsync ledger record.
const LOG_MAGIC: [u8; 4] = *b"SSLG";

/// Current ledger format version.
const LOG_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + length (4).
const HEADER_SIZE: usize = 10;

/// CRC trailer size.
const CRC_SIZE: usize = 4;

/// Computes a CRC32 (IEEE polynomial) over the given bytes.
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

/// An append-only log of CRC-protected records.
///
/// Each record is `magic + version + payload length + payload + crc32`,
/// with the CRC covering everything before it. Replay stops at the first
/// record that does not check out and truncates the file there, so a torn
/// append never corrupts subsequent runs.
pub(crate) struct RecordLog {
    path: PathBuf,
    file: Mutex<File>,
    sync_on_write: bool,
}

impl RecordLog {
    /// Opens the log, replaying every intact record into `payloads`.
    pub fn open(path: &Path, sync_on_write: bool) -> StoreResult<(Self, Vec<Vec<u8>>)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut contents = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut contents)?;

        let (payloads, valid_len) = replay(&contents);
        if (valid_len as u64) < contents.len() as u64 {
            tracing::warn!(
                path = %path.display(),
                dropped = contents.len() - valid_len,
                "truncating torn ledger tail"
            );
            file.set_len(valid_len as u64)?;
        }
        file.seek(SeekFrom::End(0))?;

        Ok((
            Self {
                path: path.to_path_buf(),
                file: Mutex::new(file),
                sync_on_write,
            },
            payloads,
        ))
    }

    /// Appends one record.
    pub fn append(&self, payload: &[u8]) -> StoreResult<()> {
        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::Encode("record payload too large".into()))?;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(payload);
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        let mut file = self.file.lock();
        file.write_all(&data)?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    /// Flushes buffered data to durable storage.
    pub fn flush(&self) -> StoreResult<()> {
        self.file.lock().sync_data()?;
        Ok(())
    }

    /// Returns the path of the backing file.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Walks `contents`, returning the intact payloads and the byte length of
/// the valid prefix.
fn replay(contents: &[u8]) -> (Vec<Vec<u8>>, usize) {
    let mut payloads = Vec::new();
    let mut offset = 0usize;

    loop {
        let remaining = &contents[offset..];
        if remaining.len() < HEADER_SIZE {
            break;
        }
        if remaining[..4] != LOG_MAGIC {
            break;
        }
        let version = u16::from_le_bytes([remaining[4], remaining[5]]);
        if version != LOG_VERSION {
            break;
        }
        let len = u32::from_le_bytes([remaining[6], remaining[7], remaining[8], remaining[9]])
            as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if remaining.len() < total {
            break;
        }

        let expected = u32::from_le_bytes([
            remaining[HEADER_SIZE + len],
            remaining[HEADER_SIZE + len + 1],
            remaining[HEADER_SIZE + len + 2],
            remaining[HEADER_SIZE + len + 3],
        ]);
        if compute_crc32(&remaining[..HEADER_SIZE + len]) != expected {
            break;
        }

        payloads.push(remaining[HEADER_SIZE..HEADER_SIZE + len].to_vec());
        offset += total;
    }

    (payloads, offset)
}
