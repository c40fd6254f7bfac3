//! 提取管道集成测试
//!
//! 覆盖寻址的确定性、去重、分类排除与无翻译往返

use pagelingo::parsers::{html_to_dom, serialize_document};
use pagelingo::translation::pipeline::{
    apply_to_summary, dedupe, extract_document, remap_by_text, CollectorConfig,
};
use pagelingo::translation::reassemble::{block_texts, reassemble};
use pagelingo::translation::record::Origin;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::HtmlTestHelper;

fn extract(html: &str) -> pagelingo::translation::pipeline::Extraction {
    extract_document(html.as_bytes(), CollectorConfig::default()).expect("extraction should succeed")
}

#[test]
fn test_addressing_is_idempotent() {
    let html = HtmlTestHelper::create_simple_english_page();
    let first = extract(&html);
    let second = extract(&html);

    assert_eq!(first.record, second.record);
    assert_eq!(first.placeholder_html, second.placeholder_html);
    assert_eq!(
        serde_json::to_string(&first.record.flat_summary()).unwrap(),
        serde_json::to_string(&second.record.flat_summary()).unwrap()
    );
}

#[test]
fn test_parallel_and_sequential_agree() {
    let html = HtmlTestHelper::create_simple_english_page();
    let sequential = extract(&html);
    let parallel = extract_document(
        html.as_bytes(),
        CollectorConfig { parallel_segmentation: true, ..CollectorConfig::default() },
    )
    .unwrap();

    assert_eq!(sequential.record, parallel.record);
    assert_eq!(sequential.placeholder_html, parallel.placeholder_html);
}

#[test]
fn test_repeated_sentence_has_one_canonical_entry() {
    let extraction = extract(&HtmlTestHelper::create_simple_english_page());
    let summary = extraction.record.flat_summary();
    let dedup = dedupe(&summary);

    let ids = &dedup.sentence_to_ids["Click here."];
    assert_eq!(ids.len(), 2);
    assert_eq!(dedup.canonical["Click here."], ids[0]);
    assert_eq!(dedup.total_count(), summary.segment_count());
    assert!(dedup.unique_count() < dedup.total_count());

    let texts: Vec<&str> = summary.blocks.values().map(|b| b.text.as_str()).collect();
    assert!(!texts.contains(&"console.log(x)"));
    let placeholder = String::from_utf8(extraction.placeholder_html).unwrap();
    assert!(placeholder.contains("<p>console.log(x)</p>"));
}

#[test]
fn test_meta_viewport_excluded_description_kept() {
    let extraction = extract(&HtmlTestHelper::create_simple_english_page());

    let metas: Vec<(&str, String)> = extraction
        .record
        .blocks
        .values()
        .filter_map(|block| match &block.origin {
            Origin::Meta(name) => Some((name.as_str(), block.text())),
            _ => None,
        })
        .collect();
    assert_eq!(metas, vec![("description", "Weekly updates.".to_string())]);

    let placeholder = String::from_utf8(extraction.placeholder_html).unwrap();
    assert!(placeholder.contains(r#"content="width=device-width, initial-scale=1""#));
}

#[test]
fn test_round_trip_without_translation() {
    let html = HtmlTestHelper::create_simple_english_page();
    let extraction = extract(&html);
    let blocks = block_texts(&extraction.record.flat_summary());

    let (restored, stats) = reassemble(&extraction.placeholder_html, "utf-8", &blocks).unwrap();
    assert_eq!(stats.missing, 0);

    let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
    let expected = serialize_document(&dom.document, "utf-8").unwrap();
    assert_eq!(String::from_utf8(restored).unwrap(), String::from_utf8(expected).unwrap());
}

#[test]
fn test_translated_summary_reassembles() {
    let extraction = extract(&HtmlTestHelper::create_simple_english_page());
    let summary = extraction.record.flat_summary();
    let dedup = dedupe(&summary);

    let translations: indexmap::IndexMap<String, String> =
        [("Click here.", "Cliquez ici."), ("Welcome.", "Bienvenue.")]
            .into_iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect();
    let translated = apply_to_summary(&summary, &remap_by_text(&translations, &dedup));

    let (html, _) =
        reassemble(&extraction.placeholder_html, "utf-8", &block_texts(&translated)).unwrap();
    let html = String::from_utf8(html).unwrap();

    assert_eq!(html.matches("<p>Cliquez ici.</p>").count(), 2);
    assert!(html.contains("<h1>Bienvenue.</h1>"));
    assert!(html.contains("<p>Hello there. How are you?</p>"));
}

#[test]
fn test_jsonld_fields_extracted_and_restored() {
    let extraction = extract(&HtmlTestHelper::create_jsonld_page());

    let jsonld: Vec<&str> = extraction
        .record
        .blocks
        .values()
        .filter_map(|block| match &block.origin {
            Origin::Jsonld(key) => Some(key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(jsonld, vec!["headline"]);

    let (html, stats) = reassemble(
        &extraction.placeholder_html,
        "utf-8",
        &block_texts(&extraction.record.flat_summary()),
    )
    .unwrap();
    assert_eq!(stats.replaced, extraction.record.len());
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains(r#""headline": "Welcome.""#));
    assert!(html.contains(r#""datePublished": "2024-01-01""#));
}
