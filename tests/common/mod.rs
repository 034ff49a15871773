//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pagechat::embedding::EmbeddingProvider;
use pagechat::inference::{GenerationParams, InferenceError, TextGenerator};

/// Build a PDF with one text line per page, in Helvetica.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

/// 10 characters.
pub const SHORT_PAGE: &str = "Title page";

/// About 200 characters about mitochondria.
pub const LONG_PAGE: &str = "Mitochondria are the powerhouse of the cell. They produce ATP through \
cellular respiration, using oxygen and glucose. Each mitochondrion has its own DNA and a double \
membrane with folded cristae.";

/// Hashed bag of words: texts sharing words land close together.
pub struct WordHashEmbedder {
    pub model: &'static str,
    pub calls: AtomicUsize,
    pub texts_embedded: AtomicUsize,
}

impl WordHashEmbedder {
    pub const DIMS: usize = 64;

    pub fn new() -> Self {
        Self::named("word-hash")
    }

    /// Same vectors, reported under a different model name.
    pub fn named(model: &'static str) -> Self {
        Self {
            model,
            calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; Self::DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % Self::DIMS as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for WordHashEmbedder {
    fn model_name(&self) -> &str {
        self.model
    }
    fn dims(&self) -> usize {
        Self::DIMS
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Records every prompt and replies with a fixed answer.
pub struct RecordingGenerator {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails as if Bedrock refused the call.
pub struct RefusingGenerator;

#[async_trait]
impl TextGenerator for RefusingGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, InferenceError> {
        Err(InferenceError::Status {
            status: 403,
            body: "AccessDeniedException: not authorized to invoke model".to_string(),
        })
    }
}
