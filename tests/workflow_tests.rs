//! End-to-end transition workflows on a blog post model.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use statefield::builder::{FieldBuilder, ModelBuilder, TransitionBuilder};
use statefield::core::{Args, Condition, PermissionSet, Principal};
use statefield::field::{Record, RecordState};
use statefield::persistence::{self, MemoryStore};
use statefield::model::{Model, SignalTarget};
use statefield::transition::Resolver;
use statefield::{FsmError, StateValue, TransitionError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("upss")]
struct Upss;

#[derive(Debug, Default, Serialize, Deserialize)]
struct BlogPost {
    #[serde(flatten)]
    fsm: RecordState,
    text: String,
    calls: u32,
}

impl Record for BlogPost {
    fn record_state(&self) -> &RecordState {
        &self.fsm
    }

    fn record_state_mut(&mut self) -> &mut RecordState {
        &mut self.fsm
    }
}

fn blog_post_model() -> Arc<Model<BlogPost>> {
    ModelBuilder::new("BlogPost")
        .field(FieldBuilder::new("state").default("new").protected())
        .transition(
            "publish",
            TransitionBuilder::new("state").source("new").target("published"),
        )
        .unwrap()
        .transition(
            "publish_or_fail",
            TransitionBuilder::new("state")
                .source("new")
                .target("published")
                .on_error("failed"),
        )
        .unwrap()
        .transition(
            "moderate",
            TransitionBuilder::new("state").from_any().target("moderated"),
        )
        .unwrap()
        .transition(
            "remove",
            TransitionBuilder::new("state")
                .from_any_except_target()
                .target("removed"),
        )
        .unwrap()
        .transition(
            "hide",
            TransitionBuilder::new("state")
                .source("published")
                .target("hidden")
                .permission("testapp.can_hide"),
        )
        .unwrap()
        .transition(
            "touch",
            TransitionBuilder::new("state").sources(["new", "published"]),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn new_post(model: &Model<BlogPost>) -> BlogPost {
    BlogPost {
        fsm: model.initial_state(),
        ..BlogPost::default()
    }
}

fn succeed(post: &mut BlogPost) -> Result<(), Upss> {
    post.calls += 1;
    Ok(())
}

#[test]
fn publish_moves_state_once() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    model.invoke(&mut post, "publish", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "published");

    let second = model.invoke(&mut post, "publish", succeed);
    match second {
        Err(TransitionError::Fsm(FsmError::TransitionNotAllowed { method, state, .. })) => {
            assert_eq!(method, "publish");
            assert_eq!(state, "published");
        }
        other => panic!("expected TransitionNotAllowed, got {other:?}"),
    }
    assert_eq!(post.calls, 1);
}

#[test]
fn failing_body_applies_error_state_and_propagates() {
    let model = blog_post_model();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    model.on_post_transition(move |signal| {
        sink.lock().push((
            signal.target.clone(),
            signal.exception.map(str::to_string),
        ));
    });

    let mut post = new_post(&model);
    let result = model.invoke(&mut post, "publish_or_fail", |_| Err::<(), _>(Upss));

    assert_eq!(result.unwrap_err().body(), Some(&Upss));
    assert_eq!(model.state(&post, "state").unwrap(), "failed");
    assert_eq!(
        *seen.lock(),
        vec![(SignalTarget::State("failed".into()), Some("upss".to_string()))]
    );
}

#[test]
fn failing_body_without_error_state_changes_nothing() {
    let model = blog_post_model();
    let posts = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&posts);
    model.on_post_transition(move |_| *counter.lock() += 1);

    let mut post = new_post(&model);
    let result = model.invoke(&mut post, "publish", |_| Err::<(), _>(Upss));

    assert!(result.unwrap_err().body().is_some());
    assert_eq!(model.state(&post, "state").unwrap(), "new");
    assert_eq!(*posts.lock(), 0);
}

#[test]
fn any_source_coexists_with_literal_source() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    let names: Vec<String> = model
        .available_transitions(&post, "state")
        .unwrap()
        .map(|t| t.name().to_string())
        .collect();
    assert!(names.contains(&"publish".to_string()));
    assert!(names.contains(&"moderate".to_string()));

    model.invoke(&mut post, "publish", succeed).unwrap();
    model.invoke(&mut post, "moderate", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "moderated");

    model.invoke(&mut post, "moderate", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "moderated");
}

#[test]
fn any_except_target_refuses_its_own_target() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    model.invoke(&mut post, "remove", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "removed");

    let again = model.invoke(&mut post, "remove", succeed);
    assert!(again.unwrap_err().is_not_allowed());
    assert!(!model.can_proceed(&post, "remove").unwrap());
}

#[test]
fn permissions_are_orthogonal_to_legality() {
    let model = blog_post_model();
    let mut post = new_post(&model);
    model.invoke(&mut post, "publish", succeed).unwrap();

    let moderator = PermissionSet::new("moderator").grant("testapp.can_hide");
    let visitor = PermissionSet::new("visitor");

    assert!(model.can_proceed(&post, "hide").unwrap());
    assert!(model.has_transition_perm(&post, "hide", &moderator).unwrap());
    assert!(!model.has_transition_perm(&post, "hide", &visitor).unwrap());

    let for_visitor: Vec<String> = model
        .available_transitions_for(&post, "state", &visitor)
        .unwrap()
        .map(|t| t.name().to_string())
        .collect();
    assert!(!for_visitor.contains(&"hide".to_string()));
    assert!(for_visitor.contains(&"moderate".to_string()));
}

fn available_for(
    model: &Model<BlogPost>,
    post: &BlogPost,
    principal: &dyn Principal,
) -> Vec<String> {
    model
        .available_transitions_for(post, "state", principal)
        .unwrap()
        .map(|t| t.name().to_string())
        .collect()
}

#[test]
fn permission_granted_on_one_record_only() {
    let model = blog_post_model();
    let store = MemoryStore::new();

    let mut granted = new_post(&model);
    model.invoke(&mut granted, "publish", succeed).unwrap();
    persistence::save(&*model, &store, &mut granted).unwrap();
    let mut other = new_post(&model);
    model.invoke(&mut other, "publish", succeed).unwrap();
    persistence::save(&*model, &store, &mut other).unwrap();

    let editor =
        PermissionSet::new("editor").grant_on("testapp.can_hide", model.object_ref(&granted));

    assert!(model.has_transition_perm(&granted, "hide", &editor).unwrap());
    assert!(!model.has_transition_perm(&other, "hide", &editor).unwrap());
    assert!(available_for(&model, &granted, &editor).contains(&"hide".to_string()));
    assert!(!available_for(&model, &other, &editor).contains(&"hide".to_string()));
}

#[test]
fn permission_predicate_sees_record_and_principal() {
    let model = ModelBuilder::new("BlogPost")
        .field(FieldBuilder::new("state").default("new"))
        .transition(
            "publish",
            TransitionBuilder::new("state")
                .source("new")
                .target("published")
                .permission_check(|post: &BlogPost, principal: &dyn Principal| {
                    post.text == "mine" || principal.has_permission("testapp.can_publish", None)
                }),
        )
        .unwrap()
        .build()
        .unwrap();
    let author = PermissionSet::new("author");
    let editor = PermissionSet::new("editor").grant("testapp.can_publish");

    let own = BlogPost {
        fsm: model.initial_state(),
        text: "mine".into(),
        ..BlogPost::default()
    };
    let foreign = new_post(&model);

    assert!(model.has_transition_perm(&own, "publish", &author).unwrap());
    assert!(!model.has_transition_perm(&foreign, "publish", &author).unwrap());
    assert!(model.has_transition_perm(&foreign, "publish", &editor).unwrap());
    assert_eq!(available_for(&model, &own, &author), vec!["publish"]);
    assert!(available_for(&model, &foreign, &author).is_empty());
    assert!(model.can_proceed(&foreign, "publish").unwrap());
}

#[test]
fn unknown_method_is_reported() {
    let model = blog_post_model();
    let post = new_post(&model);

    assert!(matches!(
        model.can_proceed(&post, "archive"),
        Err(FsmError::NotATransition { .. })
    ));
}

#[test]
fn not_allowed_call_sends_no_notifications() {
    let model = blog_post_model();
    let count = Arc::new(Mutex::new(0));
    for counter in [Arc::clone(&count), Arc::clone(&count)] {
        model.on_pre_transition(move |_| *counter.lock() += 1);
    }

    let mut post = new_post(&model);
    let result = model.invoke(&mut post, "hide", succeed);

    assert!(result.unwrap_err().is_not_allowed());
    assert_eq!(*count.lock(), 0);
    assert_eq!(post.calls, 0);
}

#[test]
fn notifications_report_source_and_target() {
    let model = blog_post_model();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let pre = Arc::clone(&seen);
    model.on_pre_transition(move |signal| {
        pre.lock().push(format!(
            "pre {} {} {:?}",
            signal.method, signal.source, signal.target
        ));
    });
    let post_sink = Arc::clone(&seen);
    model.on_post_transition(move |signal| {
        post_sink.lock().push(format!(
            "post {} {} {:?}",
            signal.method, signal.source, signal.target
        ));
    });

    let mut post = new_post(&model);
    model.invoke(&mut post, "publish", succeed).unwrap();
    model.invoke(&mut post, "touch", succeed).unwrap();

    assert_eq!(
        *seen.lock(),
        vec![
            "pre publish new State(Text(\"published\"))".to_string(),
            "post publish new State(Text(\"published\"))".to_string(),
            "pre touch published Unchanged".to_string(),
            "post touch published Unchanged".to_string(),
        ]
    );
}

#[test]
fn unchanged_target_validates_source_only() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    model.invoke(&mut post, "touch", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "new");

    model.invoke(&mut post, "remove", succeed).unwrap();
    assert!(model.invoke(&mut post, "touch", succeed).is_err());
}

#[test]
fn body_return_value_reaches_caller() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    let returned = model
        .invoke(&mut post, "publish", |post| {
            post.text = "published text".into();
            Ok::<_, Upss>(true)
        })
        .unwrap();

    assert!(returned);
    assert_eq!(post.text, "published text");
}

#[test]
fn conditions_gate_transitions() {
    let model = ModelBuilder::<BlogPost>::new("Gated")
        .field(FieldBuilder::new("state").default("new"))
        .transition(
            "publish",
            TransitionBuilder::new("state")
                .source("new")
                .target("published")
                .condition(Condition::named("has_text", |p: &BlogPost| !p.text.is_empty()))
                .when(|p: &BlogPost| p.calls < 10),
        )
        .unwrap()
        .build()
        .unwrap();

    let mut post = BlogPost {
        fsm: model.initial_state(),
        ..BlogPost::default()
    };

    assert!(!model.can_proceed(&post, "publish").unwrap());
    assert_eq!(model.available_transitions(&post, "state").unwrap().count(), 0);
    assert!(model
        .invoke(&mut post, "publish", succeed)
        .unwrap_err()
        .is_not_allowed());

    post.text = "ready".into();
    assert!(model.can_proceed(&post, "publish").unwrap());
    model.invoke(&mut post, "publish", succeed).unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "published");
}

fn review_model() -> Arc<Model<BlogPost>> {
    ModelBuilder::new("Review")
        .field(FieldBuilder::new("state").default("new"))
        .transition(
            "decide",
            TransitionBuilder::new("state")
                .source("new")
                .target_return_value(["published", "rejected"]),
        )
        .unwrap()
        .transition(
            "route",
            TransitionBuilder::new("state").source("new").target_computed(
                Resolver::new(|_: &BlogPost, args: &Args| {
                    if args.get::<bool>("allowed").unwrap_or(false) {
                        StateValue::from("approved")
                    } else {
                        StateValue::from("denied")
                    }
                })
                .allowed(["approved", "denied"]),
            ),
        )
        .unwrap()
        .transition(
            "route_anywhere",
            TransitionBuilder::new("state").source("new").target_computed(
                Resolver::new(|_: &BlogPost, args: &Args| {
                    StateValue::from(args.get::<String>("to").unwrap_or_default())
                })
                .allowed(["approved"]),
            ),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn return_value_target_uses_body_result() {
    let model = review_model();
    let mut post = new_post(&model);

    let decided = model
        .invoke(&mut post, "decide", |_| Ok::<_, Upss>("rejected"))
        .unwrap();

    assert_eq!(decided, "rejected");
    assert_eq!(model.state(&post, "state").unwrap(), "rejected");
}

#[test]
fn return_value_outside_allowed_set_is_rejected() {
    let model = review_model();
    let mut post = new_post(&model);

    let result = model.invoke(&mut post, "decide", |_| Ok::<_, Upss>("maybe"));

    assert!(matches!(
        result,
        Err(TransitionError::Fsm(FsmError::InvalidResultState { .. }))
    ));
    assert_eq!(model.state(&post, "state").unwrap(), "new");
}

#[test]
fn computed_target_sees_call_arguments() {
    let model = review_model();

    let mut allowed = new_post(&model);
    model
        .invoke_with(
            &mut allowed,
            "route",
            Args::new().kwarg("allowed", true).unwrap(),
            |_, _| Ok::<_, Upss>(()),
        )
        .unwrap();
    assert_eq!(model.state(&allowed, "state").unwrap(), "approved");

    let mut denied = new_post(&model);
    model
        .invoke_with(&mut denied, "route", Args::new(), |_, _| Ok::<_, Upss>(()))
        .unwrap();
    assert_eq!(model.state(&denied, "state").unwrap(), "denied");
}

#[test]
fn notifications_report_declared_then_realized_target() {
    let model = review_model();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pre = Arc::clone(&seen);
    model.on_pre_transition(move |signal| {
        pre.lock().push((signal.method.to_string(), signal.target.clone()));
    });
    let post_sink = Arc::clone(&seen);
    model.on_post_transition(move |signal| {
        post_sink.lock().push((signal.method.to_string(), signal.target.clone()));
    });

    let mut decided = new_post(&model);
    model
        .invoke(&mut decided, "decide", |_| Ok::<_, Upss>("published"))
        .unwrap();
    let mut routed = new_post(&model);
    model
        .invoke_with(
            &mut routed,
            "route",
            Args::new().kwarg("allowed", true).unwrap(),
            |_, _| Ok::<_, Upss>(()),
        )
        .unwrap();

    let declared = |states: [&str; 2]| states.map(StateValue::from).to_vec();
    assert_eq!(
        *seen.lock(),
        vec![
            (
                "decide".to_string(),
                SignalTarget::ReturnValue(declared(["published", "rejected"]))
            ),
            (
                "decide".to_string(),
                SignalTarget::State(StateValue::from("published"))
            ),
            (
                "route".to_string(),
                SignalTarget::Computed(Some(declared(["approved", "denied"])))
            ),
            (
                "route".to_string(),
                SignalTarget::State(StateValue::from("approved"))
            ),
        ]
    );
}

#[test]
fn computed_target_is_validated() {
    let model = review_model();
    let mut post = new_post(&model);

    let result = model.invoke_with(
        &mut post,
        "route_anywhere",
        Args::new().kwarg("to", "limbo").unwrap(),
        |_, _| Ok::<_, Upss>(()),
    );

    match result {
        Err(TransitionError::Fsm(FsmError::InvalidResultState { value, .. })) => {
            assert_eq!(value, Some(StateValue::from("limbo")));
        }
        other => panic!("expected InvalidResultState, got {other:?}"),
    }
}

fn stacked_model() -> Arc<Model<BlogPost>> {
    ModelBuilder::new("Stacked")
        .field(FieldBuilder::new("state").default("new"))
        .field(FieldBuilder::new("review_state").default("waiting"))
        .transition(
            "submit",
            TransitionBuilder::new("state").source("new").target("submitted"),
        )
        .unwrap()
        .transition(
            "submit",
            TransitionBuilder::new("review_state")
                .source("waiting")
                .target("queued")
                .on_error("blocked"),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn stacked_transitions_run_body_once() {
    let model = stacked_model();
    let mut post = new_post(&model);
    let pre = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pre);
    model.on_pre_transition(move |signal| sink.lock().push(signal.field.to_string()));

    model.invoke(&mut post, "submit", succeed).unwrap();

    assert_eq!(post.calls, 1);
    assert_eq!(model.state(&post, "state").unwrap(), "submitted");
    assert_eq!(model.state(&post, "review_state").unwrap(), "queued");
    assert_eq!(*pre.lock(), vec!["state", "review_state"]);
}

#[test]
fn stacked_transitions_fail_together() {
    let model = stacked_model();
    let mut post = BlogPost {
        fsm: model
            .initial_state_with([("review_state", "queued")])
            .unwrap(),
        ..BlogPost::default()
    };

    let result = model.invoke(&mut post, "submit", succeed);

    match result {
        Err(TransitionError::Fsm(FsmError::TransitionNotAllowed { field, .. })) => {
            assert_eq!(field, "review_state");
        }
        other => panic!("expected TransitionNotAllowed, got {other:?}"),
    }
    assert_eq!(post.calls, 0);
    assert_eq!(model.state(&post, "state").unwrap(), "new");
}

#[test]
fn stacked_error_states_apply_per_field() {
    let model = stacked_model();
    let mut post = new_post(&model);

    let result = model.invoke(&mut post, "submit", |_| Err::<(), _>(Upss));

    assert!(result.is_err());
    assert_eq!(model.state(&post, "state").unwrap(), "new");
    assert_eq!(model.state(&post, "review_state").unwrap(), "blocked");
}

#[test]
fn protected_field_refuses_direct_assignment() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    assert!(matches!(
        model.set_state(&mut post, "state", "published"),
        Err(FsmError::ProtectedField { .. })
    ));

    let set = model
        .with_unprotected(&mut post, "state", |post| {
            model.set_state(post, "state", "published")
        })
        .unwrap();
    assert!(set.is_ok());
    assert_eq!(model.state(&post, "state").unwrap(), "published");
    assert!(!post.fsm.is_unprotected("state"));
    assert!(model.set_state(&mut post, "state", "new").is_err());
}

#[test]
fn protection_is_restored_after_panic() {
    let model = blog_post_model();
    let mut post = new_post(&model);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _: Result<(), FsmError> =
            model.with_unprotected(&mut post, "state", |_| panic!("boom"));
    }));

    assert!(outcome.is_err());
    assert!(!post.fsm.is_unprotected("state"));
    assert!(model.set_state(&mut post, "state", "published").is_err());
}

#[test]
fn protection_override_is_per_instance() {
    let model = blog_post_model();
    let mut first = new_post(&model);
    let mut second = new_post(&model);

    model
        .with_unprotected(&mut first, "state", |first| {
            assert!(model.set_state(first, "state", "published").is_ok());
            assert!(model.set_state(&mut second, "state", "published").is_err());
        })
        .unwrap();
}

#[test]
fn unprotected_field_accepts_direct_assignment() {
    let model = review_model();
    let mut post = new_post(&model);

    model.set_state(&mut post, "state", "rejected").unwrap();
    assert_eq!(model.state(&post, "state").unwrap(), "rejected");
}

#[test]
fn integer_states_are_supported() {
    let model = ModelBuilder::<BlogPost>::new("Counter")
        .field(
            FieldBuilder::new("step")
                .default(0)
                .choice(0, "Draft")
                .choice(1, "Review"),
        )
        .transition(
            "advance",
            TransitionBuilder::new("step").source(0).target(1),
        )
        .unwrap()
        .build()
        .unwrap();
    let mut post = new_post(&model);

    model.invoke(&mut post, "advance", succeed).unwrap();

    assert_eq!(model.state(&post, "step").unwrap(), StateValue::Integer(1));
    let json = serde_json::to_value(&post).unwrap();
    assert_eq!(json["step"], 1);
}

#[test]
fn all_transitions_lists_every_source() {
    let model = blog_post_model();

    let all = model.all_transitions("state").unwrap();
    let touch: Vec<_> = all.iter().filter(|t| t.name() == "touch").collect();

    assert_eq!(touch.len(), 2);
    assert_eq!(all.iter().filter(|t| t.name() == "moderate").count(), 1);
    assert!(all
        .iter()
        .any(|t| t.name() == "publish_or_fail" && t.on_error() == Some(&StateValue::from("failed"))));
}

#[test]
fn abstract_models_cannot_run_transitions() {
    let base = ModelBuilder::<BlogPost>::abstract_model("BasePost")
        .field(FieldBuilder::new("state").default("new"))
        .transition(
            "publish",
            TransitionBuilder::new("state").source("new").target("published"),
        )
        .unwrap()
        .build()
        .unwrap();
    let mut post = new_post(&base);

    assert!(matches!(
        base.invoke(&mut post, "publish", succeed),
        Err(TransitionError::Fsm(FsmError::NotConcrete { .. }))
    ));
}
