use super::*;
use std::fs;
use tempfile::TempDir;

const SAMPLE: &str = r#"[
  {
    "chunk_id": "kusatsu_001",
    "section": "泉質",
    "metadata": {
      "source": "kusatsu_guide.pdf",
      "category": "泉質",
      "area": ["湯畑", "西の河原"],
      "tags": ["酸性泉", "湯畑"]
    },
    "content": "草津温泉は強酸性の泉質で知られる。"
  },
  {
    "chunk_id": "onsen_knowledge_001",
    "section": "",
    "metadata": {
      "source": "onsen_basics.pdf",
      "category": ["基礎知識"],
      "area": "",
      "keywords": ["入浴法"]
    },
    "content": "入浴前にはかけ湯をする。"
  }
]"#;

fn write_file(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write chunk file");
    path
}

#[test]
fn test_partition_from_id() {
    assert_eq!(partition_from_id("kusatsu_001"), "kusatsu");
    assert_eq!(partition_from_id("onsen_knowledge_001"), "onsen");
    assert_eq!(partition_from_id("hakone"), "hakone");
    assert_eq!(partition_from_id(""), "unknown");
    assert_eq!(partition_from_id("_orphan"), "unknown");
}

#[test]
fn test_record_to_passage() {
    let records: Vec<ChunkRecord> = serde_json::from_str(SAMPLE).expect("parse");
    let passage = Passage::from(records[0].clone());

    assert_eq!(passage.id, "kusatsu_001");
    assert_eq!(passage.topic_partition, "kusatsu");
    assert_eq!(passage.section, "泉質");
    assert_eq!(passage.source_document, "kusatsu_guide.pdf");
    assert_eq!(passage.category, vec!["泉質".to_string()]);
    assert_eq!(passage.area, vec!["湯畑".to_string(), "西の河原".to_string()]);
    assert_eq!(passage.topic_tags, vec!["湯畑".to_string(), "酸性泉".to_string()]);
}

#[test]
fn test_tags_fall_back_to_keywords() {
    let records: Vec<ChunkRecord> = serde_json::from_str(SAMPLE).expect("parse");
    let passage = Passage::from(records[1].clone());

    assert_eq!(passage.topic_partition, "onsen");
    assert_eq!(passage.topic_tags, vec!["入浴法".to_string()]);
    assert!(passage.area.is_empty());
}

#[test]
fn test_record_round_trip_preserves_shape() {
    let records: Vec<ChunkRecord> = serde_json::from_str(SAMPLE).expect("parse");
    let encoded = serde_json::to_string(&records).expect("encode");
    let decoded: Vec<ChunkRecord> = serde_json::from_str(&encoded).expect("decode");

    assert_eq!(records, decoded);
    assert!(matches!(decoded[0].metadata.category, OneOrMany::One(_)));
    assert!(matches!(decoded[0].metadata.area, OneOrMany::Many(_)));
    assert!(decoded[1].metadata.tags.is_none());
    assert!(!encoded.contains("\"tags\":null"));
}

#[test]
fn test_record_with_missing_fields() {
    let records: Vec<ChunkRecord> =
        serde_json::from_str(r#"[{"chunk_id": "beppu_01"}]"#).expect("parse");
    let passage = Passage::from(records[0].clone());

    assert_eq!(passage.topic_partition, "beppu");
    assert!(passage.content.is_empty());
    assert!(passage.category.is_empty());
}

#[test]
fn test_load_skips_missing_files() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_file(&dir, "chunks.json", SAMPLE);
    let missing = dir.path().join("missing.json");

    let passages = load_chunk_files(&[missing, path]).expect("load");
    assert_eq!(passages.len(), 2);
    assert_eq!(passages[0].id, "kusatsu_001");
}

#[test]
fn test_load_nothing_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("missing.json");

    let result = load_chunk_files(&[missing]);
    assert!(matches!(result, Err(CorpusError::NoChunks)));

    let empty = write_file(&dir, "empty.json", "[]");
    assert!(matches!(
        load_chunk_files(&[empty]),
        Err(CorpusError::NoChunks)
    ));
}

#[test]
fn test_load_rejects_malformed_file() {
    let dir = TempDir::new().expect("tempdir");
    let bad = write_file(&dir, "bad.json", "{not json");

    assert!(matches!(
        load_chunk_files(&[bad]),
        Err(CorpusError::ParseFailed { .. })
    ));
}

#[test]
fn test_load_drops_duplicate_ids() {
    let dir = TempDir::new().expect("tempdir");
    let a = write_file(&dir, "a.json", SAMPLE);
    let b = write_file(&dir, "b.json", SAMPLE);

    let passages = load_chunk_files(&[a, b]).expect("load");
    assert_eq!(passages.len(), 2);
}

#[test]
fn test_discover_chunk_files_sorted_json_only() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir, "b.json", "[]");
    write_file(&dir, "a.json", "[]");
    write_file(&dir, "notes.txt", "ignored");

    let files = discover_chunk_files(dir.path()).expect("discover");
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.json", "b.json"]);

    let absent = discover_chunk_files(&dir.path().join("nope")).expect("discover");
    assert!(absent.is_empty());
}
