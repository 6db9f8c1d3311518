use std::io;
use std::path::Path;

/// Outcome of inspecting a file's leading bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed {
    Detected(String),
    Undetectable,
}

/// Determines the real type of a file from its content, ignoring its name.
pub trait ContentSniffer: Send + Sync {
    fn sniff(&self, path: &Path) -> io::Result<Sniffed>;
}

/// Magic-byte detection backed by the `infer` signature database.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicSniffer;

impl ContentSniffer for MagicSniffer {
    fn sniff(&self, path: &Path) -> io::Result<Sniffed> {
        Ok(match infer::get_from_path(path)? {
            Some(kind) => Sniffed::Detected(kind.mime_type().to_string()),
            None => Sniffed::Undetectable,
        })
    }
}
