//! Chunk files shared by the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

pub const KUSATSU_CHUNKS: &str = r#"[
  {
    "chunk_id": "kusatsu_001",
    "section": "泉質",
    "metadata": {
      "source": "kusatsu_guide.pdf",
      "category": "泉質",
      "area": ["湯畑"],
      "tags": ["酸性泉", "湯畑"]
    },
    "content": "草津温泉は強酸性の泉質で、湯畑が有名です。"
  },
  {
    "chunk_id": "kusatsu_002",
    "section": "宿泊",
    "metadata": {
      "source": "kusatsu_guide.pdf",
      "category": ["宿泊"],
      "tags": ["旅館"]
    },
    "content": "草津のおすすめの宿は湯畑の近くに集まっています。"
  }
]"#;

pub const HAKONE_CHUNKS: &str = r#"[
  {
    "chunk_id": "hakone_001",
    "section": "観光",
    "metadata": { "source": "hakone_guide.pdf", "category": "観光", "keywords": ["美術館"] },
    "content": "箱根温泉には多くの源泉と美術館があります。"
  },
  {
    "chunk_id": "hakone_002",
    "section": "宿泊",
    "metadata": { "source": "hakone_guide.pdf", "category": "宿泊" },
    "content": "箱根のおすすめの宿は強羅や宮ノ下にあります。"
  }
]"#;

pub const GENERAL_CHUNKS: &str = r#"[
  {
    "chunk_id": "onsen_knowledge_001",
    "section": "基礎知識",
    "metadata": { "source": "onsen_basics.pdf", "category": ["基礎知識"] },
    "content": "温泉の泉質には酸性泉や硫黄泉などがあります。"
  }
]"#;

pub const PASSAGE_COUNT: usize = 5;

/// Writes the three chunk files into `dir` and returns their paths.
pub fn write_corpus(dir: &Path) -> Vec<PathBuf> {
    [
        ("kusatsu.json", KUSATSU_CHUNKS),
        ("hakone.json", HAKONE_CHUNKS),
        ("onsen_knowledge.json", GENERAL_CHUNKS),
    ]
    .into_iter()
    .map(|(name, body)| {
        let path = dir.join(name);
        fs::write(&path, body).expect("write chunk file");
        path
    })
    .collect()
}
