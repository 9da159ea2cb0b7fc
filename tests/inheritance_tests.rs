//! Abstract parents, mixins and role dispatch.

use statefield::builder::{FieldBuilder, ModelBuilder, TransitionBuilder};
use statefield::field::{Record, RecordState, Roles};
use statefield::model::Model;
use statefield::persistence::{self, MemoryStore};
use statefield::FsmError;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct Article {
    #[serde(flatten)]
    fsm: RecordState,
}

impl Record for Article {
    fn record_state(&self) -> &RecordState {
        &self.fsm
    }

    fn record_state_mut(&mut self) -> &mut RecordState {
        &mut self.fsm
    }
}

fn ok(_: &mut Article) -> Result<(), Infallible> {
    Ok(())
}

fn article(model: &Model<Article>) -> Article {
    Article {
        fsm: model.initial_state(),
    }
}

fn base_article() -> Arc<Model<Article>> {
    ModelBuilder::abstract_model("BaseArticle")
        .field(FieldBuilder::new("state").default("new"))
        .transition(
            "publish",
            TransitionBuilder::new("state").source("new").target("published"),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn names(model: &Model<Article>, record: &Article) -> Vec<String> {
    let mut names: Vec<String> = model
        .available_transitions(record, "state")
        .unwrap()
        .map(|t| t.name().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn concrete_child_inherits_abstract_transitions() {
    let base = base_article();
    let news = ModelBuilder::new("News").extends(base).build().unwrap();
    let mut record = article(&news);

    news.invoke(&mut record, "publish", ok).unwrap();

    assert_eq!(news.state(&record, "state").unwrap(), "published");
}

#[test]
fn siblings_do_not_share_transitions() {
    let base = base_article();
    let news = ModelBuilder::new("News")
        .extends(Arc::clone(&base))
        .transition(
            "embargo",
            TransitionBuilder::new("state").source("new").target("embargoed"),
        )
        .unwrap()
        .build()
        .unwrap();
    let blog = ModelBuilder::new("Blog")
        .extends(base)
        .transition(
            "draft",
            TransitionBuilder::new("state").source("new").target("draft"),
        )
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(names(&news, &article(&news)), vec!["embargo", "publish"]);
    assert_eq!(names(&blog, &article(&blog)), vec!["draft", "publish"]);

    let mut record = article(&blog);
    assert!(blog
        .invoke(&mut record, "embargo", ok)
        .unwrap_err()
        .fsm()
        .is_some());
}

#[test]
fn same_named_models_keep_their_own_transitions() {
    let base = base_article();
    let first = ModelBuilder::new("Post")
        .extends(Arc::clone(&base))
        .transition(
            "embargo",
            TransitionBuilder::new("state").source("new").target("embargoed"),
        )
        .unwrap()
        .build()
        .unwrap();
    let second = ModelBuilder::new("Post").extends(base).build().unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(names(&first, &article(&first)), vec!["embargo", "publish"]);
    assert_eq!(names(&second, &article(&second)), vec!["publish"]);

    let mut record = article(&second);
    let refused = second.invoke(&mut record, "embargo", ok).unwrap_err();
    assert!(matches!(
        refused.fsm(),
        Some(FsmError::NotATransition { .. })
    ));
}

#[test]
fn mixin_methods_are_collected() {
    let publishable = ModelBuilder::<Article>::mixin("Publishable")
        .transition(
            "archive",
            TransitionBuilder::new("state").from_any().target("archived"),
        )
        .unwrap()
        .build()
        .unwrap();
    let news = ModelBuilder::new("News")
        .extends(base_article())
        .extends(publishable)
        .build()
        .unwrap();

    let record = article(&news);
    assert_eq!(names(&news, &record), vec!["archive", "publish"]);
    assert_eq!(news.all_transitions("state").unwrap().len(), 2);
}

#[test]
fn child_method_overrides_parent_method() {
    let news = ModelBuilder::new("News")
        .extends(base_article())
        .transition(
            "publish",
            TransitionBuilder::new("state").source("new").target("live"),
        )
        .unwrap()
        .build()
        .unwrap();
    let mut record = article(&news);

    news.invoke(&mut record, "publish", ok).unwrap();

    assert_eq!(news.state(&record, "state").unwrap(), "live");
    assert_eq!(news.all_transitions("state").unwrap().len(), 1);
}

trait Movement {
    fn travel(&self) -> &'static str;
}

struct Crawl;

impl Movement for Crawl {
    fn travel(&self) -> &'static str {
        "crawl"
    }
}

struct Fly;

impl Movement for Fly {
    fn travel(&self) -> &'static str {
        "fly"
    }
}

fn insect_model() -> Arc<Model<Article>> {
    ModelBuilder::new("Insect")
        .role("Caterpillar")
        .role("Butterfly")
        .field(
            FieldBuilder::new("state")
                .default("CTR")
                .choice_with_role("CTR", "Caterpillar", "Caterpillar")
                .choice_with_role("BTF", "Butterfly", "Butterfly")
                .choice("DEAD", "Dead"),
        )
        .transition(
            "cocoon",
            TransitionBuilder::new("state").source("CTR").target("BTF"),
        )
        .unwrap()
        .transition(
            "die",
            TransitionBuilder::new("state").from_any().target("DEAD"),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn role_follows_state() {
    let model = insect_model();
    let roles: Roles<dyn Movement> = Roles::<dyn Movement>::new()
        .with("Caterpillar", Box::new(Crawl))
        .with("Butterfly", Box::new(Fly));
    let mut insect = article(&model);

    assert_eq!(insect.fsm.role(), Some("Caterpillar"));
    assert_eq!(roles.select(&insect).map(|m| m.travel()), Some("crawl"));

    model.invoke(&mut insect, "cocoon", ok).unwrap();

    assert_eq!(insect.fsm.role(), Some("Butterfly"));
    assert_eq!(roles.select(&insect).map(|m| m.travel()), Some("fly"));

    model.invoke(&mut insect, "die", ok).unwrap();
    assert_eq!(insect.fsm.role(), Some("Butterfly"));
}

#[test]
fn role_is_restored_on_load() {
    let model = insect_model();
    let store = MemoryStore::new();
    let mut insect = article(&model);
    model.invoke(&mut insect, "cocoon", ok).unwrap();
    let id = persistence::save(&*model, &store, &mut insect).unwrap();

    let loaded: Article = persistence::load(&*model, &store, id).unwrap();

    assert_eq!(loaded.fsm.role(), Some("Butterfly"));
}
