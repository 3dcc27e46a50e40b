//! Integration tests for the interactive labeling workflow

mod helpers;

use annota_common::events::AnnotaEvent;
use annota_engine::models::{
    Annotation, LabelSource, Record, RecordStatus, SubmissionResponse, Taxonomy, UNKNOWN_CODE,
};
use annota_engine::{EngineError, LabelingSession, LabelingSettings, SubmitAdvance};
use annota_common::SessionContext;
use chrono::Utc;
use helpers::fakes::{FakeNodeLookup, FakeSubmission};
use helpers::{isco_tree, node, session_context};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    submission: Arc<FakeSubmission>,
    context: SessionContext,
    session: LabelingSession,
}

fn fixture(taxonomies: Vec<Taxonomy>, record_ids: &[&str]) -> Fixture {
    let submission = Arc::new(FakeSubmission::new());
    let context = session_context();
    let session = LabelingSession::new(
        context.clone(),
        Arc::new(FakeNodeLookup::new(isco_tree())),
        submission.clone(),
        taxonomies,
        record_ids.iter().map(|id| id.to_string()).collect(),
        LabelingSettings::default(),
    );
    Fixture {
        submission,
        context,
        session,
    }
}

fn isco() -> Taxonomy {
    Taxonomy::new("ISCO", 3)
}

fn ai_annotation(level: u32, code: &str, is_leaf: bool) -> Annotation {
    Annotation {
        level,
        node_code: code.to_string(),
        taxonomy_key: "ISCO".to_string(),
        source: LabelSource::Ai,
        created_by: Some("ai".to_string()),
        created_at: Utc::now(),
        confidence_score: Some(0.7),
        label: Some(format!("Node {}", code)),
        is_leaf,
    }
}

fn record_with_ai(id: &str) -> Record {
    let mut record = Record::new(id);
    record.annotations = vec![
        ai_annotation(1, "1", false),
        ai_annotation(2, "12", false),
        ai_annotation(3, "123", true),
    ];
    record
}

fn codes(session: &LabelingSession) -> Vec<(u32, String)> {
    session
        .path()
        .unwrap()
        .labels()
        .iter()
        .map(|l| (l.level, l.node_code.clone()))
        .collect()
}

// ============================================================================
// Scenarios (tc_label_001 - tc_label_002)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn tc_label_001_isco_select_unknown_and_submit() {
    // Given: an unlabelled record and ISCO (max depth 3)
    let mut f = fixture(vec![isco()], &["s1", "s2"]);
    f.session.open_record(Record::new("s1")).unwrap();
    assert!(!f.session.can_submit());

    // When: 1 → 12 → Unknown
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.select_node(&node(2, "12", Some("1"), false)).unwrap();
    f.session.select_unknown().unwrap();

    // Then: three labels, Unknown is a leaf, submit enabled
    assert_eq!(
        codes(&f.session),
        vec![
            (1, "1".to_string()),
            (2, "12".to_string()),
            (3, UNKNOWN_CODE.to_string())
        ]
    );
    assert!(f.session.path().unwrap().labels()[2].is_leaf);
    assert!(f.session.can_submit());
    assert!(f.session.completion().all_completed);

    // When: submitted
    let advance = f.session.submit().await.unwrap();

    // Then: the request carries exactly the ISCO path, annotations replaced
    let requests = f.submission.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.record_id, "s1");
    assert_eq!(request.status, RecordStatus::Submitted);
    assert_eq!(request.taxonomy_key.as_deref(), Some("ISCO"));
    let sent: Vec<_> = request
        .annotations
        .iter()
        .map(|a| (a.level, a.node_code.as_str(), a.source))
        .collect();
    assert_eq!(
        sent,
        vec![
            (1, "1", LabelSource::User),
            (2, "12", LabelSource::User),
            (3, UNKNOWN_CODE, LabelSource::User)
        ]
    );
    assert_eq!(
        Some(request.labeling_started_at),
        f.session.labeling_started_at()
    );

    let record = f.session.current_record().unwrap();
    assert_eq!(record.status, RecordStatus::Submitted);
    assert_eq!(record.labels_for("ISCO").len(), 3);
    assert_eq!(advance, SubmitAdvance::NextRecord("s2".to_string()));
}

#[tokio::test(start_paused = true)]
async fn tc_label_002_ai_path_delete_then_restore() {
    // Given: AI suggested [1, 12, 123(leaf)]
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(record_with_ai("s1")).unwrap();
    assert!(!f.session.is_divergent());
    // AI-only terminal path: submittable, never complete
    assert!(f.session.can_submit());
    assert!(f.session.completion().completed_taxonomies.is_empty());

    // When: the user deletes level 3
    assert!(f.session.delete_label(3).unwrap());

    // Then: divergence (2 < 3) and nothing to submit
    assert!(f.session.is_divergent());
    assert!(!f.session.can_submit());

    // When: restored
    assert!(f.session.restore_ai().unwrap());

    // Then: the 3-entry AI path is back
    assert_eq!(
        codes(&f.session),
        vec![
            (1, "1".to_string()),
            (2, "12".to_string()),
            (3, "123".to_string())
        ]
    );
    assert!(f
        .session
        .path()
        .unwrap()
        .labels()
        .iter()
        .all(|l| l.source == LabelSource::Ai));
    assert!(!f.session.is_divergent());
    assert!(f.session.can_submit());
}

// ============================================================================
// Submission rules (tc_label_010 - tc_label_017)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn tc_label_010_non_terminal_path_rejected_locally() {
    // Given: only level 1 selected
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(Record::new("s1")).unwrap();
    f.session.select_node(&node(1, "1", None, false)).unwrap();

    // When: submit is attempted
    let err = f.session.submit().await.unwrap_err();

    // Then: validation error, nothing sent
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(f.submission.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tc_label_011_double_submit_throttled() {
    // Given: a submittable path
    let mut f = fixture(vec![isco()], &["s1", "s2"]);
    f.session.open_record(Record::new("s1")).unwrap();
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.select_node(&node(2, "11", Some("1"), true)).unwrap();
    f.session.submit().await.unwrap();

    // When: the same submit again inside the throttle window
    let second = f.session.submit().await;

    // Then: throttled, nothing sent
    assert!(matches!(second, Err(EngineError::Throttled(id)) if id == "s1"));
    assert_eq!(f.submission.requests().len(), 1);

    // When: a flag toggle, then a repeat of it inside the window
    assert!(f.session.toggle_flag().await.unwrap());
    let repeat = f.session.toggle_flag().await;

    // Then: the repeat is throttled
    assert!(matches!(repeat, Err(EngineError::Throttled(_))));
    assert_eq!(f.submission.requests().len(), 2);

    // When: the window passes
    tokio::time::advance(Duration::from_millis(1_001)).await;

    // Then: writes go through again
    assert!(!f.session.toggle_flag().await.unwrap());
    assert_eq!(f.submission.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn tc_label_012_incomplete_record_advances_to_next_taxonomy() {
    // Given: ISCO and NACE active; server reports only ISCO complete
    let mut f = fixture(vec![isco(), Taxonomy::new("NACE", 2)], &["s1"]);
    f.session.open_record(Record::new("s1")).unwrap();
    assert_eq!(f.session.active_taxonomy().unwrap().key, "ISCO");
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.select_node(&node(2, "11", Some("1"), true)).unwrap();
    f.submission.respond_with(Ok(SubmissionResponse {
        status: RecordStatus::Pending,
        completed_taxonomies: vec!["ISCO".to_string()],
        all_completed: false,
    }));

    // When: submitted
    let advance = f.session.submit().await.unwrap();

    // Then: NACE becomes active, record stays pending
    assert_eq!(advance, SubmitAdvance::NextTaxonomy("NACE".to_string()));
    assert_eq!(f.session.active_taxonomy().unwrap().key, "NACE");
    assert_eq!(f.session.current_record().unwrap().status, RecordStatus::Pending);
    assert_eq!(
        f.session.completion().completed_taxonomies,
        vec!["ISCO".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn tc_label_013_flag_leaves_status_and_annotations() {
    // Given: a record with AI annotations
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(record_with_ai("s1")).unwrap();

    // When: flag toggled
    let flagged = f.session.toggle_flag().await.unwrap();

    // Then: status unchanged, no taxonomy, no annotations sent
    assert!(flagged);
    let requests = f.submission.requests();
    let request = &requests[0];
    assert_eq!(request.status, RecordStatus::Pending);
    assert!(request.flagged);
    assert!(request.taxonomy_key.is_none());
    assert!(request.annotations.is_empty());
    let record = f.session.current_record().unwrap();
    assert!(record.flagged);
    assert_eq!(record.annotations.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn tc_label_014_skip_clears_annotations_and_advances() {
    // Given: the last record of the working set, with AI labels
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(record_with_ai("s1")).unwrap();

    // When: skipped (no terminal path needed)
    let advance = f.session.skip().await.unwrap();

    // Then: status skipped, annotations cleared, working set exhausted
    assert_eq!(advance, SubmitAdvance::Exhausted);
    let requests = f.submission.requests();
    let request = &requests[0];
    assert_eq!(request.status, RecordStatus::Skipped);
    assert!(request.annotations.is_empty());
    let record = f.session.current_record().unwrap();
    assert_eq!(record.status, RecordStatus::Skipped);
    assert!(record.annotations.is_empty());

    // And: the label path and completion match the cleared record
    assert!(f.session.path().unwrap().labels().is_empty());
    assert!(!f.session.can_submit());
    let completion = f.session.completion();
    assert!(completion.completed_taxonomies.is_empty());
    assert!(!completion.all_completed);
}

#[tokio::test(start_paused = true)]
async fn tc_label_015_backend_failure_leaves_record_untouched() {
    // Given: the backend rejects the submission
    let mut f = fixture(vec![isco()], &["s1", "s2"]);
    f.session.open_record(Record::new("s1")).unwrap();
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.select_node(&node(2, "11", Some("1"), true)).unwrap();
    f.submission.respond_with(Err(
        annota_engine::services::ServiceError::Api(500, "boom".to_string()),
    ));

    // When: submitted
    let err = f.session.submit().await.unwrap_err();

    // Then: backend error, no annotations written, still on s1
    assert!(matches!(err, EngineError::Backend(_)));
    let record = f.session.current_record().unwrap();
    assert!(record.annotations.is_empty());
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(f.session.working_set().current(), Some("s1"));
}

#[tokio::test(start_paused = true)]
async fn tc_label_016_open_record_outside_working_set_rejected() {
    let mut f = fixture(vec![isco()], &["s1"]);
    assert!(matches!(
        f.session.open_record(Record::new("zz")),
        Err(EngineError::Validation(_))
    ));
    assert!(f.session.current_record().is_none());
}

#[tokio::test(start_paused = true)]
async fn tc_label_017_next_taxonomy_submit_not_throttled() {
    // Given: ISCO submitted, NACE now active
    let mut f = fixture(vec![isco(), Taxonomy::new("NACE", 2)], &["s1"]);
    f.session.open_record(Record::new("s1")).unwrap();
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.select_node(&node(2, "11", Some("1"), true)).unwrap();
    f.submission.respond_with(Ok(SubmissionResponse {
        status: RecordStatus::Pending,
        completed_taxonomies: vec!["ISCO".to_string()],
        all_completed: false,
    }));
    let advance = f.session.submit().await.unwrap();
    assert_eq!(advance, SubmitAdvance::NextTaxonomy("NACE".to_string()));

    // When: a NACE leaf is submitted 500 ms later
    tokio::time::advance(Duration::from_millis(500)).await;
    f.session.select_node(&node(1, "A", None, true)).unwrap();
    let advance = f.session.submit().await.unwrap();

    // Then: sent for NACE, record done
    let requests = f.submission.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].taxonomy_key.as_deref(), Some("NACE"));
    assert_eq!(advance, SubmitAdvance::Exhausted);
}

// ============================================================================
// Navigation and notifications (tc_label_020 - tc_label_023)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn tc_label_020_label_changes_are_announced() {
    // Given: a subscriber on the session
    let mut f = fixture(vec![isco()], &["s1"]);
    let mut subscription = f.context.subscribe();
    f.session.open_record(Record::new("s1")).unwrap();

    // When: select, then delete
    f.session.select_node(&node(1, "1", None, false)).unwrap();
    f.session.delete_label(1).unwrap();
    // No-op delete is not announced
    assert!(!f.session.delete_label(1).unwrap());

    // Then: two LabelPathChanged events with depths 1 and 0
    let mut depths = Vec::new();
    for _ in 0..2 {
        match subscription.recv().await.unwrap() {
            AnnotaEvent::LabelPathChanged {
                record_id,
                taxonomy_key,
                depth,
                ..
            } => {
                assert_eq!(record_id, "s1");
                assert_eq!(taxonomy_key, "ISCO");
                depths.push(depth);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(depths, vec![1, 0]);
}

#[tokio::test(start_paused = true)]
async fn tc_label_021_load_level_follows_selection() {
    // Given: an open record
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(Record::new("s1")).unwrap();

    // When/Then: root lists level 1, selecting 1 lists its children
    let root = f.session.load_level().await.unwrap();
    let codes: Vec<_> = root.nodes().iter().map(|n| n.code.as_str()).collect();
    assert_eq!(codes, vec!["1", "5"]);

    f.session.select_node(&node(1, "1", None, false)).unwrap();
    let children = f.session.load_level().await.unwrap();
    let codes: Vec<_> = children.nodes().iter().map(|n| n.code.as_str()).collect();
    assert_eq!(codes, vec!["11", "12"]);
}

#[tokio::test(start_paused = true)]
async fn tc_label_022_search_result_replaces_path() {
    // Given: a path under 1
    let mut f = fixture(vec![isco()], &["s1"]);
    f.session.open_record(Record::new("s1")).unwrap();
    f.session.select_node(&node(1, "1", None, false)).unwrap();

    // When: searching "cook" and choosing the hit
    let hits = f.session.search("cook").await.unwrap().unwrap();
    assert_eq!(hits.len(), 1);
    assert!(f.session.path().unwrap().is_searching());
    f.session.select_search_result(&hits[0]).await.unwrap();

    // Then: the whole path is the reconstructed chain, query cleared
    assert_eq!(
        codes(&f.session),
        vec![
            (1, "5".to_string()),
            (2, "51".to_string()),
            (3, "512".to_string())
        ]
    );
    assert!(!f.session.path().unwrap().is_searching());
    assert!(f.session.can_submit());
}

#[tokio::test(start_paused = true)]
async fn tc_label_023_reopening_record_recaptures_snapshot() {
    // Given: s1 opened with AI labels, then s2
    let mut f = fixture(vec![isco()], &["s1", "s2"]);
    f.session.open_record(record_with_ai("s1")).unwrap();
    assert!(f.session.reconciler().snapshot("s1", "ISCO").is_some());

    f.session.open_record(Record::new("s2")).unwrap();

    // Then: s1's snapshot was dropped, s2 has none
    assert!(f.session.reconciler().snapshot("s1", "ISCO").is_none());
    assert!(f.session.reconciler().snapshot("s2", "ISCO").is_none());
    assert!(!f.session.is_divergent());
    assert_eq!(f.session.working_set().current(), Some("s2"));
}
