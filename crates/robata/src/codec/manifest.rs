use serde::{Deserialize, Serialize};

/// Job statistics the service writes next to the outputs
/// (`manifest.json.out` on Bedrock).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub total_record_count: u64,
    #[serde(default)]
    pub processed_record_count: u64,
    #[serde(default)]
    pub success_record_count: u64,
    #[serde(default)]
    pub error_record_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token_count: Option<u64>,
}

pub fn decode_manifest(bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_bedrock_manifest() {
        let manifest = decode_manifest(
            br#"{"totalRecordCount":120,"processedRecordCount":120,"successRecordCount":117,"errorRecordCount":3,"inputTokenCount":51234,"outputTokenCount":9001}"#,
        )
        .unwrap();
        assert_eq!(manifest.total_record_count, 120);
        assert_eq!(manifest.error_record_count, 3);
        assert_eq!(manifest.output_token_count, Some(9001));
    }

    #[test]
    fn test_missing_fields_default() {
        let manifest = decode_manifest(br#"{"totalRecordCount":5}"#).unwrap();
        assert_eq!(manifest.success_record_count, 0);
        assert!(manifest.input_token_count.is_none());
        assert!(decode_manifest(b"[]").is_err());
    }
}
