#![allow(dead_code)]

use article_photo_kit::config::StorageConfig;
use article_photo_kit::models::photo::StoredPhoto;
use article_photo_kit::models::settings::ResizeProfile;
use article_photo_kit::services::photo_store::{PhotoStore, StoreError};
use article_photo_kit::services::sniffer::{ContentSniffer, MagicSniffer, Sniffed};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// thumb = 100x100, small = 400x400.
pub fn storage(root: &Path) -> StorageConfig {
    StorageConfig::new(root).with_profiles(vec![
        ResizeProfile::new("thumb", 100, 100),
        ResizeProfile::new("small", 400, 400),
    ])
}

/// Records every call; optionally knows only a fixed set of articles.
#[derive(Default)]
pub struct InMemoryPhotoStore {
    next_id: AtomicI32,
    articles: Option<HashSet<i32>>,
    pub calls: Mutex<Vec<(i32, String)>>,
}

impl InMemoryPhotoStore {
    pub fn with_articles(ids: &[i32]) -> Self {
        Self {
            articles: Some(ids.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn store(&self, article_id: i32, filename: &str) -> Result<StoredPhoto, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push((article_id, filename.to_string()));

        if let Some(articles) = &self.articles {
            if !articles.contains(&article_id) {
                return Err(StoreError::ArticleNotFound(article_id));
            }
        }

        Ok(StoredPhoto {
            photo_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            article_id,
            image_path: filename.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        })
    }
}

pub struct FailingPhotoStore;

#[async_trait]
impl PhotoStore for FailingPhotoStore {
    async fn store(&self, _article_id: i32, _filename: &str) -> Result<StoredPhoto, StoreError> {
        Err(StoreError::Database(sea_orm::DbErr::Custom(
            "connection reset".to_string(),
        )))
    }
}

/// Magic-byte sniffer that counts how often it ran.
#[derive(Default)]
pub struct CountingSniffer {
    pub calls: AtomicUsize,
}

impl CountingSniffer {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentSniffer for CountingSniffer {
    fn sniff(&self, path: &Path) -> std::io::Result<Sniffed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        MagicSniffer.sniff(path)
    }
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 31 + y * 17) % 256) as u8,
            ((x ^ y) % 256) as u8,
            ((x * y) % 251) as u8,
        ])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
    buffer.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 200, 255]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// A 64-bit ELF header followed by padding.
pub fn elf_bytes() -> Vec<u8> {
    let mut bytes = b"\x7FELF\x02\x01\x01\0".to_vec();
    bytes.resize(4096, 0x90);
    bytes
}

pub fn gif_bytes() -> Vec<u8> {
    let mut bytes = b"GIF89a\x01\0\x01\0\x80\0\0".to_vec();
    bytes.resize(256, 0);
    bytes
}

/// Every regular file below `root`, recursively.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}
