//! End-to-end tagging properties over a real SQLite store
//!
//! Each test drives the service (or a pipeline inside a store transaction)
//! and checks the resulting rows through the read-only graph queries.

mod common;

use common::{
    names_and_types, service, service_with_catalog, store, DocumentBuilder, FailAfter,
    CAMPAIGN_NOTE,
};
use lorelink::nlp::dep;
use lorelink::{
    GraphStats, GraphStore, HeuristicAnalyzer, Label, MentionType, NodeStatus, PartOfSpeech,
    Pipeline, Provenance, TagError, TagRequest, TagService, VocabularyIndex, VocabularySource,
    VocabularySources,
};
use std::sync::Arc;

fn tag(service: &TagService, text: &str, note_id: i64, owner_id: i64) -> Vec<lorelink::TaggedNode> {
    service
        .tag(&TagRequest::new(text, note_id, owner_id))
        .expect("tagging should succeed")
}

// ── Worked example ──────────────────────────────────────────────────────

#[test]
fn campaign_note_creates_three_linked_nodes() {
    let service = service();
    let tagged = tag(&service, CAMPAIGN_NOTE, 1, 1);

    assert_eq!(
        names_and_types(&tagged),
        vec![
            ("Aria".to_string(), "PERSON".to_string()),
            ("Fireball".to_string(), "SPELL".to_string()),
            ("Sunken Keep".to_string(), "LOCATION".to_string()),
        ]
    );
    assert!(tagged.iter().all(|t| t.status == NodeStatus::New));

    let stats = service.store().stats(Some(1)).unwrap();
    assert_eq!(
        stats,
        GraphStats {
            nodes: 3,
            mentions: 3,
            links: 6,
            relationships: 2
        }
    );

    let keep = tagged[2].id;
    let relationships = service.store().relationships_for(keep).unwrap();
    assert_eq!(relationships.len(), 2);
    assert!(relationships
        .iter()
        .all(|r| r.parent_node_id == keep && r.relationship_type == "located_in"));

    let keep_mentions = service.store().mentions_for_node(keep).unwrap();
    assert_eq!((keep_mentions[0].start_pos, keep_mentions[0].end_pos), (44, 55));
}

// ── Idempotence ─────────────────────────────────────────────────────────

#[test]
fn retagging_the_same_note_adds_nothing() {
    let service = service();
    let first = tag(&service, CAMPAIGN_NOTE, 7, 1);
    let before = service.store().stats(None).unwrap();

    let second = tag(&service, CAMPAIGN_NOTE, 7, 1);
    let after = service.store().stats(None).unwrap();

    assert_eq!(before, after);
    assert!(second.iter().all(|t| t.status == NodeStatus::Existing));
    let first_ids: Vec<_> = first.iter().map(|t| t.id).collect();
    let second_ids: Vec<_> = second.iter().map(|t| t.id).collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn a_later_note_reuses_nodes_and_adds_its_own_rows() {
    let service = service();
    tag(&service, CAMPAIGN_NOTE, 1, 1);
    let tagged = tag(&service, CAMPAIGN_NOTE, 2, 1);

    assert!(tagged.iter().all(|t| t.status == NodeStatus::Existing));
    let stats = service.store().stats(Some(1)).unwrap();
    assert_eq!((stats.nodes, stats.mentions, stats.links, stats.relationships), (3, 6, 12, 4));
}

#[test]
fn case_variants_across_notes_share_one_node() {
    let service = service();
    let first = tag(&service, "Zoë rested", 1, 1);
    let second = tag(&service, "ZOË rested", 2, 1);

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].status, NodeStatus::New);
    assert_eq!(second[0].status, NodeStatus::Existing);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(service.store().stats(Some(1)).unwrap().nodes, 1);

    let found = service.store().find_nodes_by_name("zoë", 1, None).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Zoë");
}

// ── Span exclusivity and precedence ─────────────────────────────────────

#[test]
fn accepted_spans_never_overlap() {
    let service = service_with_catalog(&[("core_items", &["Sword of Dawn"])]);
    let tagged = tag(&service, "Lord Varis drew the Sword of Dawn in Waterdeep", 3, 1);

    let mut spans: Vec<(usize, usize)> = tagged
        .iter()
        .flat_map(|t| service.store().mentions_for_node(t.id).unwrap())
        .filter(|m| m.note_id == 3)
        .map(|m| (m.start_pos, m.end_pos))
        .collect();
    spans.sort();
    spans.dedup();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping spans {:?}", pair);
    }

    let sword = tagged.iter().find(|t| t.name == "Sword of Dawn").expect("catalog item tagged");
    assert_eq!(sword.node_type, MentionType::Taxonomy(Label::Item));
    assert_eq!(sword.source, Provenance::Exact);
}

#[test]
fn vocabulary_beats_the_classifier() {
    let service = service_with_catalog(&[("core_items", &["Fireball"])]);
    let tagged = tag(&service, CAMPAIGN_NOTE, 1, 1);

    let fireball = tagged.iter().find(|t| t.name == "Fireball").unwrap();
    assert_eq!(fireball.node_type, MentionType::Taxonomy(Label::Item));
    assert_eq!(fireball.source, Provenance::Exact);
    assert_eq!(fireball.confidence, 1.0);
}

// ── Edges ───────────────────────────────────────────────────────────────

#[test]
fn links_are_symmetric_and_the_first_location_contains_the_rest() {
    let store = store();
    let index = VocabularyIndex::from_terms([
        (Label::Person, "Bors"),
        (Label::Person, "Mira"),
        (Label::Monster, "Owlbear"),
        (Label::Location, "Waterdeep"),
    ]);
    let pipeline = Pipeline::with_index(Arc::new(HeuristicAnalyzer::new()), index);
    let document = pipeline.analyze("Bors and Mira fought an owlbear near Waterdeep").unwrap();

    let tagged = store
        .with_transaction(|cursor| pipeline.tag_document(&document, 11, 4, cursor))
        .unwrap();
    assert_eq!(tagged.len(), 4);
    assert!(tagged.iter().all(|t| t.source == Provenance::Exact));

    let stats = store.stats(Some(4)).unwrap();
    assert_eq!((stats.nodes, stats.links, stats.relationships), (4, 12, 3));

    for node in &tagged {
        let outgoing = store.links_from(node.id).unwrap();
        assert_eq!(outgoing.len(), 3);
        for link in outgoing {
            let back = store.links_from(link.target_node_id).unwrap();
            assert!(back.contains(&link.reversed()));
        }
    }

    let waterdeep = tagged.iter().find(|t| t.name == "Waterdeep").unwrap().id;
    let contained = store.relationships_for(waterdeep).unwrap();
    assert_eq!(contained.len(), 3);
    assert!(contained
        .iter()
        .all(|r| r.parent_node_id == waterdeep && r.child_node_id != waterdeep));
}

// ── Tenancy ─────────────────────────────────────────────────────────────

#[test]
fn owners_never_share_nodes() {
    let service = service();
    let mine = tag(&service, CAMPAIGN_NOTE, 1, 1);
    let theirs = tag(&service, CAMPAIGN_NOTE, 2, 2);

    assert!(theirs.iter().all(|t| t.status == NodeStatus::New));
    assert!(mine.iter().all(|m| theirs.iter().all(|t| t.id != m.id)));
    assert_eq!(service.store().stats(Some(1)).unwrap().nodes, 3);
    assert_eq!(service.store().stats(Some(2)).unwrap().nodes, 3);

    let found = service.store().find_nodes_by_name("aria", 2, None).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].owner, 2);
}

// ── Atomicity ───────────────────────────────────────────────────────────

#[test]
fn a_failure_mid_note_leaves_no_rows() {
    let service = service();
    let pipeline = service.pipeline().unwrap();
    let document = pipeline.analyze(CAMPAIGN_NOTE).unwrap();

    let result = service.store().with_transaction(|cursor| {
        let mut failing = FailAfter::new(cursor, 2);
        pipeline.tag_document(&document, 1, 1, &mut failing)
    });

    assert!(matches!(result, Err(TagError::Storage(_))));
    assert_eq!(service.store().stats(None).unwrap(), GraphStats::default());
}

// ── Readiness ───────────────────────────────────────────────────────────

#[test]
fn an_unreadable_source_refuses_every_request() {
    let sources = VocabularySources::default()
        .with_source(Label::Monster, VocabularySource::new("homebrew_monsters", "name"));
    let service = TagService::new(store(), Arc::new(HeuristicAnalyzer::new()), sources);

    let status = service.status().unwrap();
    assert!(!status.ready);
    assert!(status.reason.is_some());

    let err = service.tag(&TagRequest::new(CAMPAIGN_NOTE, 1, 1)).unwrap_err();
    assert!(matches!(err, TagError::NotReady(_)));
    assert!(matches!(service.rebuild(), Err(TagError::NotReady(_))));
    assert_eq!(service.store().stats(None).unwrap(), GraphStats::default());
}

#[test]
fn rebuild_learns_names_from_earlier_notes() {
    let service = service();
    let first = tag(&service, "Aria cast Fireball", 1, 1);
    let aria = first.iter().find(|t| t.name == "Aria").unwrap().id;

    let status = service.rebuild().unwrap();
    assert!(status.ready);
    assert_eq!(status.labels.get(&Label::Person), Some(&1));
    assert_eq!(status.labels.get(&Label::Spell), Some(&1));

    let second = tag(&service, "we met aria again", 2, 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, aria);
    assert_eq!(second[0].status, NodeStatus::Existing);
    assert_eq!(second[0].source, Provenance::Exact);
}

// ── External analysis ───────────────────────────────────────────────────

#[test]
fn a_supplied_document_is_used_instead_of_the_analyzer() {
    let document = DocumentBuilder::new()
        .token("They", "they", PartOfSpeech::Pron, dep::NSUBJ, 1)
        .token("reached", "reach", PartOfSpeech::Verb, dep::ROOT, 1)
        .token("Neverwinter", "Neverwinter", PartOfSpeech::Propn, dep::DOBJ, 1)
        .entity(2, 3, "GPE")
        .build();
    let request = TagRequest::new(document.text.clone(), 5, 1).with_document(document);

    let service = service();
    let tagged = service.tag(&request).unwrap();

    assert_eq!(names_and_types(&tagged), vec![("Neverwinter".to_string(), "LOCATION".to_string())]);
    assert_eq!(tagged[0].source, Provenance::Passthrough);
    assert_eq!(tagged[0].confidence, 0.80);
}

#[test]
fn a_mismatched_document_is_rejected() {
    let document = DocumentBuilder::new()
        .token("Neverwinter", "Neverwinter", PartOfSpeech::Propn, dep::ROOT, 0)
        .entity(0, 1, "GPE")
        .build();
    let request = TagRequest::new("Waterdeep", 5, 1).with_document(document);

    let err = service().tag(&request).unwrap_err();
    assert!(matches!(err, TagError::InvalidRequest(_)));
}
