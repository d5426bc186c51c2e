use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

/// A reference to media hosted elsewhere, e.g. an uploaded image or a data url
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    pub url: String,
    pub media_type: String,
}

impl MediaContent {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_wire_names() {
        let media = MediaContent {
            url: "https://cdn.portal.ai/cat.png".into(),
            media_type: "image/png".into(),
        };
        assert_eq!(
            serde_json::to_value(&media).unwrap(),
            json!({"url": "https://cdn.portal.ai/cat.png", "mediaType": "image/png"})
        );
    }

    #[test]
    fn test_media_kind() {
        assert!(MediaContent {
            url: "x".into(),
            media_type: "image/jpeg".into()
        }
        .is_image());
        assert!(!MediaContent {
            url: "x".into(),
            media_type: "application/pdf".into()
        }
        .is_image());
    }
}
