// `multipart/related` body for Drive's multipart upload protocol.
//
// reqwest's multipart support only speaks `multipart/form-data`, which Drive
// rejects for uploads, so the two-part body is assembled by hand: JSON
// metadata first, then the raw media.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub struct RelatedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Build the request body for a metadata + media upload.
pub fn related_body(metadata: &serde_json::Value, media_type: &str, media: &[u8]) -> RelatedBody {
    let boundary = pick_boundary(media);
    let metadata = metadata.to_string();

    let mut bytes = Vec::with_capacity(metadata.len() + media.len() + 256);
    bytes.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    bytes.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    bytes.extend_from_slice(metadata.as_bytes());
    bytes.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    bytes.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    bytes.extend_from_slice(media);
    bytes.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    RelatedBody {
        content_type: format!("multipart/related; boundary={}", boundary),
        bytes,
    }
}

/// A random boundary that does not occur in the payload.
fn pick_boundary(media: &[u8]) -> String {
    loop {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let boundary = format!("publish_{}", token);
        if !contains(media, boundary.as_bytes()) {
            return boundary;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
