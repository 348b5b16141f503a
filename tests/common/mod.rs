#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Duration;

use docqa::{
    AnswerGenerator, AnswerProvider, ChunkStore, ChunkingConfig, Embedder, Embedding,
    ProviderSettings, RagEngine,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const DIMENSIONS: usize = 64;

/// Bag-of-words hashing embedder; identical words land in identical buckets.
pub struct HashingEmbedder;

impl HashingEmbedder {
    fn vectorize(text: &str) -> Embedding {
        let mut out = vec![0.0f32; DIMENSIONS];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            out[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }
        out
    }
}

impl Embedder for HashingEmbedder {
    fn embed_documents(&self, texts: &[&str]) -> docqa::Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| Self::vectorize(text)).collect())
    }

    fn embed_query(&self, text: &str) -> docqa::Result<Embedding> {
        Ok(Self::vectorize(text))
    }

    fn model_name(&self) -> &str {
        "test-hashing"
    }
}

/// Engine over a temp store whose Groq provider points at a closed local port.
pub fn engine(data_dir: &Path, chunking: ChunkingConfig) -> RagEngine {
    let settings = ProviderSettings {
        groq_api_key: Some("gsk_test".to_string()),
        groq_base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(2),
        ..ProviderSettings::default()
    };
    let provider = AnswerProvider::from_settings(&settings).expect("provider");
    let generator = AnswerGenerator::new(provider, 0.3, 256);
    let store = ChunkStore::open(data_dir).expect("open store");
    RagEngine::new(Box::new(HashingEmbedder), store, generator, chunking, 5)
}

/// Builds a PDF with one page per entry; each page shows its lines of text.
pub fn build_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    assemble_pdf(pages, true)
}

/// A page that selects font `F1` without declaring any font resources.
pub fn pdf_without_font_resource() -> Vec<u8> {
    assemble_pdf(&[vec!["orphaned text".to_string()]], false)
}

fn assemble_pdf(pages: &[Vec<String>], with_fonts: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = if with_fonts {
        doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        })
    } else {
        doc.add_object(dictionary! {})
    };

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        if !lines.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("TL", vec![12.into()]));
            operations.push(Operation::new("Td", vec![40.into(), 800.into()]));
            for line in lines {
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(line.as_str())],
                ));
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

/// `pages` pages of `lines_per_page` lines, ten distinct words per line, prefixed by `tag`.
pub fn numbered_pdf(tag: &str, pages: usize, lines_per_page: usize) -> Vec<u8> {
    let mut counter = 0usize;
    let content: Vec<Vec<String>> = (0..pages)
        .map(|_| {
            (0..lines_per_page)
                .map(|_| {
                    let words: Vec<String> = (0..10)
                        .map(|_| {
                            counter += 1;
                            format!("{tag}{counter}")
                        })
                        .collect();
                    words.join(" ")
                })
                .collect()
        })
        .collect();
    build_pdf(&content)
}
