use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::engine::EngineError;
use crate::version::Version;

const HEADER_SIZE: usize = 0x400;
const MAGIC_OFFSET: usize = 0x1C;
const TITLE_OFFSET: usize = 0x20;
const GAMECUBE_MAGIC: u32 = 0xC233_9F3D;

/// Revision byte the Korean release carries under the NTSC-U game id.
const KOREAN_REVISION: u8 = 0x30;

/// The boot header at the start of a GameCube disc image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiscHeader {
    pub game_id: [u8; 6],
    pub disc_number: u8,
    pub revision: u8,
    pub title: String,
}

impl DiscHeader {
    pub fn parse(raw: &[u8]) -> Result<DiscHeader, EngineError> {
        if raw.len() < HEADER_SIZE {
            return Err(EngineError::Container(format!(
                "image is {} bytes, too small to hold a disc header",
                raw.len()
            )));
        }

        let magic = u32::from_be_bytes([
            raw[MAGIC_OFFSET],
            raw[MAGIC_OFFSET + 1],
            raw[MAGIC_OFFSET + 2],
            raw[MAGIC_OFFSET + 3],
        ]);
        if magic != GAMECUBE_MAGIC {
            return Err(EngineError::Container(format!(
                "not a GameCube disc image (magic 0x{:08X})",
                magic
            )));
        }

        let mut game_id = [0u8; 6];
        game_id.copy_from_slice(&raw[0..6]);

        let title_bytes = &raw[TITLE_OFFSET..HEADER_SIZE];
        let nul_pos = title_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..nul_pos]).into_owned();

        Ok(DiscHeader {
            game_id,
            disc_number: raw[6],
            revision: raw[7],
            title,
        })
    }

    pub fn read_from(path: &Path) -> Result<DiscHeader, EngineError> {
        let mut raw = Vec::with_capacity(HEADER_SIZE);
        File::open(path)?
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut raw)?;
        DiscHeader::parse(&raw)
    }

    pub fn game_id_str(&self) -> String {
        String::from_utf8_lossy(&self.game_id).into_owned()
    }

    pub fn version(&self) -> Option<Version> {
        match (&self.game_id, self.disc_number, self.revision) {
            (b"GM8E01", 0, 0) => Some(Version::NtscU0_00),
            (b"GM8E01", 0, 1) => Some(Version::NtscU0_01),
            (b"GM8E01", 0, 2) => Some(Version::NtscU0_02),
            (b"GM8E01", 0, KOREAN_REVISION) => Some(Version::NtscK),
            (b"GM8J01", 0, 0) => Some(Version::NtscJ),
            (b"GM8P01", 0, 0) => Some(Version::Pal),
            _ => None,
        }
    }

    /// The version tag for this disc. Builds without a table still get a
    /// descriptive tag (`GM8E01-rev5`, `GM8E01-disc1-rev0`) so the registry
    /// can reject it by name.
    pub fn version_tag(&self) -> String {
        match self.version() {
            Some(version) => version.tag().to_string(),
            None if self.disc_number != 0 => format!(
                "{}-disc{}-rev{}",
                self.game_id_str(),
                self.disc_number,
                self.revision
            ),
            None => format!("{}-rev{}", self.game_id_str(), self.revision),
        }
    }
}

#[cfg(test)]
pub(crate) fn fake_header(game_id: &[u8; 6], revision: u8) -> Vec<u8> {
    let mut raw = vec![0u8; HEADER_SIZE];
    raw[0..6].copy_from_slice(game_id);
    raw[7] = revision;
    raw[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&GAMECUBE_MAGIC.to_be_bytes());
    let title = b"Metroid Prime";
    raw[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title);
    raw
}
