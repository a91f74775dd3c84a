use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::discovery_service::DiscoveryError;

/// The slice of a discovery document we need to address API methods.
///
/// Deserializes straight from Google's discovery JSON; everything we don't
/// read (schemas, parameters, auth) is dropped on the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescription {
    pub name: String,
    pub version: String,
    pub root_url: String,
    pub service_path: String,
    #[serde(default)]
    pub resources: HashMap<String, ResourceDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    #[serde(default)]
    pub methods: HashMap<String, MethodDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescription {
    pub id: String,
    pub path: String,
    pub http_method: String,
    #[serde(default)]
    pub media_upload: Option<MediaUpload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaUpload {
    pub protocols: UploadProtocols,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProtocols {
    #[serde(default)]
    pub simple: Option<UploadProtocol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProtocol {
    #[serde(default)]
    pub multipart: bool,
    pub path: String,
}

/// A fully expanded method address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub http_method: String,
    pub url: String,
}

impl ApiDescription {
    pub fn method(&self, resource: &str, method: &str) -> Result<&MethodDescription, DiscoveryError> {
        self.resources
            .get(resource)
            .and_then(|r| r.methods.get(method))
            .ok_or_else(|| DiscoveryError::UnknownMethod(format!("{}.{}", resource, method)))
    }

    /// Address of a plain (metadata-only) call.
    pub fn endpoint(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Endpoint, DiscoveryError> {
        let description = self.method(resource, method)?;
        let path = expand_path(&description.path, params)?;

        Ok(Endpoint {
            http_method: description.http_method.clone(),
            url: format!("{}{}{}", self.root_url, self.service_path, path),
        })
    }

    /// Address of the media-upload variant of a method.
    pub fn upload_endpoint(
        &self,
        resource: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Endpoint, DiscoveryError> {
        let description = self.method(resource, method)?;
        let protocol = description
            .media_upload
            .as_ref()
            .and_then(|m| m.protocols.simple.as_ref())
            .filter(|p| p.multipart)
            .ok_or_else(|| {
                DiscoveryError::UnknownMethod(format!(
                    "{}.{} does not accept multipart uploads",
                    resource, method
                ))
            })?;
        let path = expand_path(&protocol.path, params)?;

        Ok(Endpoint {
            http_method: description.http_method.clone(),
            url: format!(
                "{}/{}",
                self.root_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
        })
    }
}

/// Substitute `{name}` placeholders with percent-encoded values.
fn expand_path(template: &str, params: &[(&str, &str)]) -> Result<String, DiscoveryError> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let end = rest[start..]
            .find('}')
            .map(|offset| start + offset)
            .ok_or_else(|| DiscoveryError::UnknownMethod(format!("malformed path {}", template)))?;
        let name = &rest[start + 1..end];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                DiscoveryError::UnknownMethod(format!("missing path parameter {} for {}", name, template))
            })?;

        expanded.push_str(&rest[..start]);
        encode_segment(value, &mut expanded);
        rest = &rest[end + 1..];
    }
    expanded.push_str(rest);

    Ok(expanded)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_segment(value: &str, out: &mut String) {
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Trimmed Drive v2 discovery document, shaped like the real one.
    pub fn drive_v2_document(root_url: &str) -> serde_json::Value {
        serde_json::json!({
            "kind": "discovery#restDescription",
            "name": "drive",
            "version": "v2",
            "rootUrl": root_url,
            "servicePath": "drive/v2/",
            "resources": {
                "files": {
                    "methods": {
                        "insert": {
                            "id": "drive.files.insert",
                            "path": "files",
                            "httpMethod": "POST",
                            "mediaUpload": {
                                "accept": ["*/*"],
                                "protocols": {
                                    "simple": { "multipart": true, "path": "/upload/drive/v2/files" },
                                    "resumable": { "multipart": true, "path": "/resumable/upload/drive/v2/files" }
                                }
                            }
                        },
                        "copy": {
                            "id": "drive.files.copy",
                            "path": "files/{fileId}/copy",
                            "httpMethod": "POST"
                        },
                        "update": {
                            "id": "drive.files.update",
                            "path": "files/{fileId}",
                            "httpMethod": "PUT",
                            "mediaUpload": {
                                "protocols": {
                                    "simple": { "multipart": true, "path": "/upload/drive/v2/files/{fileId}" }
                                }
                            }
                        }
                    }
                },
                "children": {
                    "methods": {
                        "list": {
                            "id": "drive.children.list",
                            "path": "files/{folderId}/children",
                            "httpMethod": "GET"
                        }
                    }
                }
            },
            "schemas": { "File": { "id": "File", "type": "object" } }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::drive_v2_document;
    use super::*;

    fn drive() -> ApiDescription {
        serde_json::from_value(drive_v2_document("https://www.googleapis.com/")).unwrap()
    }

    #[test]
    fn test_endpoint_expands_path_parameters() {
        let endpoint = drive()
            .endpoint("files", "copy", &[("fileId", "abc 1")])
            .unwrap();

        assert_eq!(endpoint.http_method, "POST");
        assert_eq!(
            endpoint.url,
            "https://www.googleapis.com/drive/v2/files/abc%201/copy"
        );
    }

    #[test]
    fn test_upload_endpoint_uses_media_path() {
        let endpoint = drive()
            .upload_endpoint("files", "update", &[("fileId", "X")])
            .unwrap();

        assert_eq!(endpoint.http_method, "PUT");
        assert_eq!(endpoint.url, "https://www.googleapis.com/upload/drive/v2/files/X");
    }

    #[test]
    fn test_unknown_method_and_missing_upload() {
        let api = drive();

        assert!(matches!(
            api.endpoint("files", "delete", &[]),
            Err(DiscoveryError::UnknownMethod(_))
        ));
        assert!(matches!(
            api.upload_endpoint("files", "copy", &[("fileId", "X")]),
            Err(DiscoveryError::UnknownMethod(_))
        ));
        assert!(matches!(
            api.endpoint("children", "list", &[]),
            Err(DiscoveryError::UnknownMethod(_))
        ));
    }
}
