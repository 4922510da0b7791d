//! Content-type sniffing over the leading bytes of a stream.
//!
//! Signatures follow the WHATWG MIME sniffing algorithm: markup is matched
//! after leading whitespace and case-insensitively, binary formats by exact
//! or masked prefix. Unknown data falls back to plain text when it contains
//! no control bytes, and to `application/octet-stream` otherwise.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use kit_sync::CancelToken;

use crate::error::{FsError, FsResult};

/// Number of leading bytes considered when sniffing.
pub const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

enum Signature {
    /// Case-insensitive markup tag, terminated by a space or `>`.
    Html(&'static [u8]),
    /// Prefix compared after masking; `skip_ws` ignores leading whitespace.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
    },
    Exact(&'static [u8]),
    Mp4,
}

impl Signature {
    fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Html(tag) => {
                let data = trim_leading_ws(data);
                if data.len() < tag.len() + 1 {
                    return false;
                }
                let head_matches = tag
                    .iter()
                    .zip(data)
                    .all(|(t, d)| if t.is_ascii_uppercase() { d & 0xDF == *t } else { d == t });
                head_matches && is_tag_terminator(data[tag.len()])
            }
            Self::Masked {
                mask,
                pattern,
                skip_ws,
            } => {
                let data = if *skip_ws { trim_leading_ws(data) } else { data };
                data.len() >= pattern.len()
                    && mask
                        .iter()
                        .zip(*pattern)
                        .zip(data)
                        .all(|((m, p), d)| d & m == *p)
            }
            Self::Exact(prefix) => data.starts_with(prefix),
            Self::Mp4 => is_mp4(data),
        }
    }
}

static SIGNATURES: &[(Signature, &str)] = &[
    (Signature::Html(b"<!DOCTYPE HTML"), "text/html; charset=utf-8"),
    (Signature::Html(b"<HTML"), "text/html; charset=utf-8"),
    (Signature::Html(b"<HEAD"), "text/html; charset=utf-8"),
    (Signature::Html(b"<SCRIPT"), "text/html; charset=utf-8"),
    (Signature::Html(b"<IFRAME"), "text/html; charset=utf-8"),
    (Signature::Html(b"<H1"), "text/html; charset=utf-8"),
    (Signature::Html(b"<DIV"), "text/html; charset=utf-8"),
    (Signature::Html(b"<FONT"), "text/html; charset=utf-8"),
    (Signature::Html(b"<TABLE"), "text/html; charset=utf-8"),
    (Signature::Html(b"<A"), "text/html; charset=utf-8"),
    (Signature::Html(b"<STYLE"), "text/html; charset=utf-8"),
    (Signature::Html(b"<TITLE"), "text/html; charset=utf-8"),
    (Signature::Html(b"<B"), "text/html; charset=utf-8"),
    (Signature::Html(b"<BODY"), "text/html; charset=utf-8"),
    (Signature::Html(b"<BR"), "text/html; charset=utf-8"),
    (Signature::Html(b"<P"), "text/html; charset=utf-8"),
    (Signature::Html(b"<!--"), "text/html; charset=utf-8"),
    (
        Signature::Masked {
            mask: b"\xFF\xFF\xFF\xFF\xFF",
            pattern: b"<?xml",
            skip_ws: true,
        },
        "text/xml; charset=utf-8",
    ),
    (Signature::Exact(b"%PDF-"), "application/pdf"),
    (Signature::Exact(b"%!PS-Adobe-"), "application/postscript"),
    // Byte order marks.
    (Signature::Exact(b"\xFE\xFF"), "text/plain; charset=utf-16be"),
    (Signature::Exact(b"\xFF\xFE"), "text/plain; charset=utf-16le"),
    (Signature::Exact(b"\xEF\xBB\xBF"), TEXT_PLAIN),
    // Images.
    (Signature::Exact(b"\x00\x00\x01\x00"), "image/x-icon"),
    (Signature::Exact(b"\x00\x00\x02\x00"), "image/x-icon"),
    (Signature::Exact(b"BM"), "image/bmp"),
    (Signature::Exact(b"GIF87a"), "image/gif"),
    (Signature::Exact(b"GIF89a"), "image/gif"),
    (
        Signature::Masked {
            mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
            pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
            skip_ws: false,
        },
        "image/webp",
    ),
    (Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A"), "image/png"),
    (Signature::Exact(b"\xFF\xD8\xFF"), "image/jpeg"),
    // Audio and video.
    (
        Signature::Masked {
            mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
            pattern: b"FORM\x00\x00\x00\x00AIFF",
            skip_ws: false,
        },
        "audio/aiff",
    ),
    (Signature::Exact(b"ID3"), "audio/mpeg"),
    (Signature::Exact(b"OggS\x00"), "application/ogg"),
    (Signature::Exact(b"MThd\x00\x00\x00\x06"), "audio/midi"),
    (
        Signature::Masked {
            mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
            pattern: b"RIFF\x00\x00\x00\x00AVI ",
            skip_ws: false,
        },
        "video/avi",
    ),
    (
        Signature::Masked {
            mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
            pattern: b"RIFF\x00\x00\x00\x00WAVE",
            skip_ws: false,
        },
        "audio/wave",
    ),
    (Signature::Mp4, "video/mp4"),
    (Signature::Exact(b"\x1A\x45\xDF\xA3"), "video/webm"),
    // Fonts.
    (Signature::Exact(b"\x00\x01\x00\x00"), "font/ttf"),
    (Signature::Exact(b"OTTO"), "font/otf"),
    (Signature::Exact(b"ttcf"), "font/collection"),
    (Signature::Exact(b"wOFF"), "font/woff"),
    (Signature::Exact(b"wOF2"), "font/woff2"),
    // Archives.
    (Signature::Exact(b"\x1F\x8B\x08"), "application/x-gzip"),
    (Signature::Exact(b"PK\x03\x04"), "application/zip"),
    (Signature::Exact(b"Rar!\x1A\x07\x00"), "application/x-rar-compressed"),
    (Signature::Exact(b"Rar!\x1A\x07\x01\x00"), "application/x-rar-compressed"),
    (Signature::Exact(b"\x00asm\x01\x00\x00\x00"), "application/wasm"),
];

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_tag_terminator(b: u8) -> bool {
    b == b' ' || b == b'>'
}

fn trim_leading_ws(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !is_ws(*b)).unwrap_or(data.len());
    &data[start..]
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Major brand at 8..12, minor version at 12..16, compatible brands after.
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| &data[offset..offset + 3] == b"mp4")
}

/// MIME type of `data`, judged from at most its first [`SNIFF_LEN`] bytes.
///
/// Always returns a valid MIME string.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    SIGNATURES
        .iter()
        .find(|(signature, _)| signature.matches(data))
        .map(|(_, mime)| *mime)
        .unwrap_or_else(|| {
            if data.iter().copied().any(is_binary) {
                OCTET_STREAM
            } else {
                TEXT_PLAIN
            }
        })
}

/// Read up to [`SNIFF_LEN`] bytes from `reader` and sniff their type.
///
/// An empty stream is an error; there is nothing to judge.
pub async fn content_type_of<R>(reader: &mut R) -> FsResult<&'static str>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(SNIFF_LEN);
    reader
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| FsError::ObtainContentType(e.to_string()))?;
    if buffer.is_empty() {
        return Err(FsError::ObtainContentType("empty stream".into()));
    }
    Ok(sniff_content_type(&buffer))
}

/// Sniff the content type of the file at `path`.
pub async fn content_type_of_file(
    cancel: &CancelToken,
    path: impl AsRef<Path>,
) -> FsResult<&'static str> {
    let path = path.as_ref();
    cancel.check()?;
    let mut file = File::open(path)
        .await
        .map_err(|source| FsError::FailedToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;
    content_type_of(&mut file).await
}
