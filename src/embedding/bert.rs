//! BERT-family encoders on candle: a mean-pooled sentence encoder and a cross-encoder head.
//!
//! Both load `config.json` + `model.safetensors` from a model directory. Weights may be
//! stored under a `bert.` or `roberta.` prefix or at the root.

use std::path::Path;

use candle_core::{DType, Device, IndexOp, Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};

fn read_config(model_dir: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(model_dir.join("config.json"))?;
    serde_json::from_str(&raw)
        .map_err(|e| candle_core::Error::Msg(format!("failed to parse config.json: {e}")))
}

fn var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights = model_dir.join("model.safetensors");
    // SAFETY: the weights file is opened read-only and not modified while mapped.
    unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device) }
}

fn load_backbone(vb: &VarBuilder, config: &Config) -> Result<BertModel> {
    if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
        BertModel::load(vb.pp("bert"), config)
    } else if vb.contains_tensor("roberta.embeddings.word_embeddings.weight") {
        BertModel::load(vb.pp("roberta"), config)
    } else {
        BertModel::load(vb.clone(), config)
    }
}

/// Sentence encoder: mean pooling over non-padding tokens, then L2 normalization.
pub struct MeanPoolEncoder {
    bert: BertModel,
    hidden_size: usize,
}

impl MeanPoolEncoder {
    pub fn load(model_dir: &Path, device: &Device) -> Result<Self> {
        let config = read_config(model_dir)?;
        let vb = var_builder(model_dir, device)?;
        let bert = load_backbone(&vb, &config)?;
        Ok(Self {
            bert,
            hidden_size: config.hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// `[batch, seq]` inputs to `[batch, hidden]` unit vectors.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden = self
            .bert
            .forward(input_ids, token_type_ids, Some(attention_mask))?;
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = summed.broadcast_div(&counts)?;
        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        pooled.broadcast_div(&norms)
    }
}

enum ClassifierHead {
    /// `classifier` linear layer on the CLS token (BERT style).
    Linear(Linear),
    /// `classifier.dense` + tanh + `classifier.out_proj` (RoBERTa style).
    Projected { dense: Linear, out_proj: Linear },
}

impl ClassifierHead {
    fn load(vb: VarBuilder, hidden_size: usize) -> Result<Self> {
        if vb.contains_tensor("classifier.out_proj.weight") {
            let head = vb.pp("classifier");
            Ok(Self::Projected {
                dense: candle_nn::linear(hidden_size, hidden_size, head.pp("dense"))?,
                out_proj: candle_nn::linear(hidden_size, 1, head.pp("out_proj"))?,
            })
        } else {
            Ok(Self::Linear(candle_nn::linear(
                hidden_size,
                1,
                vb.pp("classifier"),
            )?))
        }
    }

    fn forward(&self, cls: &Tensor) -> Result<Tensor> {
        match self {
            Self::Linear(linear) => linear.forward(cls),
            Self::Projected { dense, out_proj } => out_proj.forward(&dense.forward(cls)?.tanh()?),
        }
    }
}

/// Pairwise relevance model producing one raw logit per `(query, passage)` pair.
pub struct CrossEncoder {
    bert: BertModel,
    head: ClassifierHead,
}

impl CrossEncoder {
    pub fn load(model_dir: &Path, device: &Device) -> Result<Self> {
        let config = read_config(model_dir)?;
        let vb = var_builder(model_dir, device)?;
        let bert = load_backbone(&vb, &config)?;
        let head = ClassifierHead::load(vb, config.hidden_size)?;
        Ok(Self { bert, head })
    }

    /// `[batch, seq]` inputs to `[batch]` logits.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let output = self
            .bert
            .forward(input_ids, token_type_ids, Some(attention_mask))?;
        let cls = output.i((.., 0, ..))?;
        self.head.forward(&cls)?.flatten_all()
    }
}

/// Stacks equally-long token rows into a `[rows, len]` u32 tensor.
pub fn stack_rows(rows: &[&[u32]], device: &Device) -> Result<Tensor> {
    let len = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut flat = Vec::with_capacity(rows.len() * len);
    for row in rows {
        if row.len() != len {
            return Err(candle_core::Error::Msg(format!(
                "ragged token batch: expected {len} tokens, got {}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Tensor::from_vec(flat, (rows.len(), len), device)
}
