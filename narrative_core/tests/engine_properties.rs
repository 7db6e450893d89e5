//! End-to-end properties of `analyze_narrative` and `generate_continuation`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use narrative_core::testing::{ScriptedCapability, ScriptedGenerator};
use narrative_core::{
    AnalysisCapability, CapabilityTable, GenerationError, HeuristicResolver, InMemoryKnowledgeBase,
    NarrativeEngine, NarrativeError,
};
use rand::Rng;
use story_model::{
    AgentKind, AgentResult, CausalLink, CharacterMention, EmotionSpan, EventMention,
    KnowledgeEntry, NarrativeModel, SettingDescriptor, StoryStreamConfig, ThemeLabel,
    TimelineMode,
};
use tokio::time::Instant;

const ELARA_STORY: &str = "Once upon a time, there was a young woman named Elara who lived in a small village by the sea. \
She dreamed of exploring the world beyond the horizon. One day, a mysterious ship arrived at the harbor. \
The captain offered her a chance to join the crew. Despite her family's concerns, Elara decided to embark on the journey. \
At sea, she discovered she had a natural talent for navigation using the stars.";

const TWO_SENTENCES: &str = "Once upon a time, there was a young woman named Elara who lived in a small village by the sea. \
She dreamed of exploring the world beyond the horizon.";

/// One scripted result per kind, with entities that interact across kinds.
fn fixture(kind: AgentKind) -> AgentResult {
    let result = AgentResult::new(kind);
    match kind {
        AgentKind::Causal => result
            .with_entity(EventMention::new("The ship arrived", 120))
            .with_entity(EventMention::new("Elara joined the crew", 200))
            .with_entity(CausalLink::new("The ship arrived", "Elara joined the crew", 0.9))
            .with_entity(CausalLink::new("Elara", "Elara joined the crew", 0.8))
            .with_entity(CausalLink::new("The storm", "The ship arrived", 0.4)),
        AgentKind::Character => result.with_entities([
            CharacterMention::new("Elara", 40)
                .with_trait("young")
                .with_attribute("role", "villager"),
            CharacterMention::new("The Captain", 160).with_alias("captain"),
        ]),
        AgentKind::Setting => result
            .with_entity(SettingDescriptor::timeline(TimelineMode::Linear))
            .with_entity(SettingDescriptor::location("a small village by the sea", 60))
            .with_entity(SettingDescriptor::location("the harbor", 140)),
        AgentKind::Theme => result
            .with_entity(ThemeLabel::new("adventure", 0.8))
            .with_entity(ThemeLabel::new("family", 0.3)),
        AgentKind::Emotional => result
            .with_entity(CharacterMention::new("elara", 40).with_attribute("role", "dreamer"))
            .with_entity(EmotionSpan::new(0, 90, "hope", 0.6))
            .with_entity(EmotionSpan::new(80, 150, "fear", 0.7))
            .with_entity(EmotionSpan::new(140, 220, "anticipation", 0.5))
            .with_entity(EmotionSpan::new(230, 300, "wonder", 0.9)),
    }
}

fn config_for(kinds: &[AgentKind]) -> StoryStreamConfig {
    let mut config = StoryStreamConfig::default();
    config.agents.enable_only(kinds);
    config.knowledge_integration.enabled = false;
    config
}

fn model_path(config: &StoryStreamConfig, kind: AgentKind) -> String {
    config
        .agents
        .get(kind)
        .model_path
        .clone()
        .expect("default config has a model path for every kind")
}

/// Engine whose agents return `fixture(kind)` after the given delay.
fn scripted_engine(kinds: &[AgentKind], delays_ms: &[u64]) -> NarrativeEngine {
    let config = config_for(kinds);
    let mut table = CapabilityTable::new();
    for (i, kind) in AgentKind::ALL.into_iter().enumerate() {
        let delay = Duration::from_millis(delays_ms.get(i).copied().unwrap_or(0));
        let capability: Arc<dyn AnalysisCapability> =
            Arc::new(ScriptedCapability::new(fixture(kind)).with_delay(delay));
        table = table.with_capability(kind, model_path(&config, kind), capability);
    }
    NarrativeEngine::builder(config).resolver(table).build().unwrap()
}

fn heuristic_engine(kinds: &[AgentKind]) -> NarrativeEngine {
    NarrativeEngine::builder(config_for(kinds))
        .resolver(HeuristicResolver::new())
        .build()
        .unwrap()
}

fn subsets() -> impl Iterator<Item = Vec<AgentKind>> {
    (0u32..32).map(|mask| {
        AgentKind::ALL
            .into_iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, kind)| kind)
            .collect()
    })
}

fn assert_referential_integrity(model: &NarrativeModel) {
    for edge in model.causal_graph.edges() {
        for end in [&edge.cause, &edge.effect] {
            assert!(
                model.causal_graph.has_event(end) || model.characters.contains_key(end),
                "dangling edge endpoint {end}"
            );
        }
    }
}

fn assert_arc_well_formed(model: &NarrativeModel) {
    for pair in model.emotional_arc.windows(2) {
        assert!(pair[0].start <= pair[1].start, "arc not sorted");
        assert!(pair[0].end <= pair[1].start, "arc spans overlap");
    }
}

#[tokio::test]
async fn causal_edges_never_dangle() {
    for kinds in subsets().filter(|k| !k.is_empty()) {
        let scripted = scripted_engine(&kinds, &[]).analyze_narrative(ELARA_STORY).await.unwrap();
        assert_referential_integrity(&scripted);

        let heuristic = heuristic_engine(&kinds).analyze_narrative(ELARA_STORY).await.unwrap();
        assert_referential_integrity(&heuristic);
    }
}

#[tokio::test]
async fn character_endpoint_needs_character_agent() {
    let with = scripted_engine(&[AgentKind::Causal, AgentKind::Character], &[])
        .analyze_narrative(ELARA_STORY)
        .await
        .unwrap();
    assert_eq!(with.causal_graph.edge_count(), 2);
    assert_eq!(with.causal_graph.effects_of("elara"), vec!["elara joined the crew"]);

    let without = scripted_engine(&[AgentKind::Causal], &[])
        .analyze_narrative(ELARA_STORY)
        .await
        .unwrap();
    assert_eq!(without.causal_graph.edge_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn merge_ignores_completion_order() {
    let baseline = scripted_engine(&AgentKind::ALL, &[])
        .analyze_narrative(ELARA_STORY)
        .await
        .unwrap();

    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let delays: Vec<u64> = (0..AgentKind::ALL.len()).map(|_| rng.gen_range(0..500)).collect();
        let model = scripted_engine(&AgentKind::ALL, &delays)
            .analyze_narrative(ELARA_STORY)
            .await
            .unwrap();
        assert_eq!(model, baseline, "delays {delays:?} changed the merge");
    }
}

#[tokio::test]
async fn priority_order_decides_scalar_conflicts() {
    let model = scripted_engine(&AgentKind::ALL, &[500, 400, 300, 200, 0])
        .analyze_narrative(ELARA_STORY)
        .await
        .unwrap();
    assert_eq!(model.characters["elara"].attributes["role"], "villager");
}

#[tokio::test]
async fn nothing_enabled_is_an_error() {
    let engine = heuristic_engine(&[]);
    assert!(engine.registry().is_empty());

    let err = engine.analyze_narrative(ELARA_STORY).await.unwrap_err();
    assert!(matches!(err, NarrativeError::NoAnalysisCapability));
}

#[tokio::test]
async fn single_agent_fills_only_its_dimension() {
    for kind in AgentKind::ALL {
        let model = heuristic_engine(&[kind]).analyze_narrative(ELARA_STORY).await.unwrap();

        assert_eq!(!model.causal_graph.is_empty(), kind == AgentKind::Causal, "{kind}");
        assert_eq!(!model.characters.is_empty(), kind == AgentKind::Character, "{kind}");
        assert_eq!(!model.setting.is_empty(), kind == AgentKind::Setting, "{kind}");
        assert_eq!(!model.themes.is_empty(), kind == AgentKind::Theme, "{kind}");
        assert_eq!(!model.emotional_arc.is_empty(), kind == AgentKind::Emotional, "{kind}");
    }
}

#[tokio::test]
async fn overlapping_spans_resolved() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let spans: Vec<EmotionSpan> = (0..30)
            .map(|_| {
                let start = rng.gen_range(0..400);
                let len = rng.gen_range(0..60);
                EmotionSpan::new(start, start + len, "mood", rng.gen_range(0.0..1.0))
            })
            .collect();
        let result = AgentResult::new(AgentKind::Emotional).with_entities(spans);

        let config = config_for(&[AgentKind::Emotional]);
        let table = CapabilityTable::new().with_capability(
            AgentKind::Emotional,
            model_path(&config, AgentKind::Emotional),
            Arc::new(ScriptedCapability::new(result)),
        );
        let engine = NarrativeEngine::builder(config).resolver(table).build().unwrap();

        let model = engine.analyze_narrative(ELARA_STORY).await.unwrap();
        assert!(!model.emotional_arc.is_empty());
        assert_arc_well_formed(&model);
    }
}

#[tokio::test]
async fn scripted_arc_keeps_stronger_spans() {
    let model = scripted_engine(&[AgentKind::Emotional], &[])
        .analyze_narrative(ELARA_STORY)
        .await
        .unwrap();
    let labels: Vec<_> = model.emotional_arc.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["fear", "wonder"]);
}

#[tokio::test]
async fn continuation_from_successful_generator() {
    let engine = NarrativeEngine::builder(config_for(&AgentKind::ALL))
        .generator(Arc::new(ScriptedGenerator::reply(
            "The stars led her north, toward a coast no map had named.",
        )))
        .build()
        .unwrap();

    let text = engine.generate_continuation(ELARA_STORY, 150).await.unwrap();
    assert!(!text.is_empty());
}

#[tokio::test]
async fn continuation_failure_is_generation_error() {
    let engine = NarrativeEngine::builder(config_for(&AgentKind::ALL))
        .generator(Arc::new(ScriptedGenerator::failing("model overloaded")))
        .build()
        .unwrap();

    let err = engine.generate_continuation(ELARA_STORY, 150).await.unwrap_err();
    assert!(matches!(err, NarrativeError::Generation(GenerationError::Failed(_))));
}

#[tokio::test]
async fn elara_with_character_and_setting_only() {
    let model = heuristic_engine(&[AgentKind::Character, AgentKind::Setting])
        .analyze_narrative(TWO_SENTENCES)
        .await
        .unwrap();

    let keys: BTreeSet<_> = model.characters.keys().map(String::as_str).collect();
    assert_eq!(keys, BTreeSet::from(["elara"]));
    assert!(model.setting.has_location("a small village by the sea"));
    assert!(model.causal_graph.is_empty());
    assert!(model.themes.is_empty());
    assert!(model.emotional_arc.is_empty());
}

#[tokio::test]
async fn analysis_is_idempotent() {
    let mut config = StoryStreamConfig::default();
    config.knowledge_integration.enabled = true;
    let store = InMemoryKnowledgeBase::from_entries([KnowledgeEntry::new("Elara", "is_a", "navigator")]);
    let engine = NarrativeEngine::builder(config)
        .knowledge_backend(Arc::new(store))
        .build()
        .unwrap();

    let first = engine.analyze_narrative(ELARA_STORY).await.unwrap();
    let second = engine.analyze_narrative(ELARA_STORY).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.characters["elara"].knowledge.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_abandons_slow_agents() {
    let engine = scripted_engine(&AgentKind::ALL, &[0, 0, 0, 0, 5_000]);

    let deadline = Instant::now() + Duration::from_secs(1);
    let model = engine
        .analyze_narrative_until(ELARA_STORY, Some(deadline))
        .await
        .unwrap();

    assert!(model.emotional_arc.is_empty());
    assert!(!model.themes.is_empty());
    assert!(!model.characters.is_empty());
}

#[tokio::test]
async fn failing_agent_is_tolerated() {
    let config = config_for(&AgentKind::ALL);
    let mut table = CapabilityTable::new();
    for kind in AgentKind::ALL {
        let capability: Arc<dyn AnalysisCapability> = if kind == AgentKind::Theme {
            Arc::new(ScriptedCapability::failing(kind, "corpus corrupted"))
        } else {
            Arc::new(ScriptedCapability::new(fixture(kind)))
        };
        table = table.with_capability(kind, model_path(&config, kind), capability);
    }
    let engine = NarrativeEngine::builder(config).resolver(table).build().unwrap();

    let model = engine.analyze_narrative(ELARA_STORY).await.unwrap();
    assert!(model.themes.is_empty());
    assert_eq!(model.characters.len(), 2);
    assert_eq!(model.setting.locations.len(), 2);
}

#[tokio::test]
async fn unresolved_model_excludes_only_that_agent() {
    let config = config_for(&AgentKind::ALL);
    let table = CapabilityTable::new().with_capability(
        AgentKind::Theme,
        model_path(&config, AgentKind::Theme),
        Arc::new(ScriptedCapability::new(fixture(AgentKind::Theme))),
    );
    let engine = NarrativeEngine::builder(config).resolver(table).build().unwrap();

    assert_eq!(engine.registry().kinds(), vec![AgentKind::Theme]);
    assert_eq!(engine.registry().unavailable().len(), 4);

    let model = engine.analyze_narrative(ELARA_STORY).await.unwrap();
    assert_eq!(model.themes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn alias_reported_by_one_agent_is_a_name_for_another() {
    let config = config_for(&[AgentKind::Character, AgentKind::Emotional]);
    let character = AgentResult::new(AgentKind::Character)
        .with_entity(CharacterMention::new("Robert", 8).with_alias("Bob"));
    let emotional = AgentResult::new(AgentKind::Emotional)
        .with_entity(CharacterMention::new("Bob", 0).with_trait("anxious"));
    let table = CapabilityTable::new()
        .with_capability(
            AgentKind::Character,
            model_path(&config, AgentKind::Character),
            Arc::new(
                ScriptedCapability::new(character).with_delay(Duration::from_millis(300)),
            ),
        )
        .with_capability(
            AgentKind::Emotional,
            model_path(&config, AgentKind::Emotional),
            Arc::new(ScriptedCapability::new(emotional)),
        );
    let engine = NarrativeEngine::builder(config).resolver(table).build().unwrap();

    let model = engine.analyze_narrative("Bob, or Robert, hesitated.").await.unwrap();
    let keys: Vec<_> = model.characters.keys().map(String::as_str).collect();
    assert_eq!(keys, ["robert"]);
    let robert = &model.characters["robert"];
    assert!(robert.aliases.contains("bob"));
    assert!(robert.traits.contains("anxious"));
    assert_eq!(robert.first_mention, 0);
}
