//! End-to-end reconciliation behavior against the in-memory host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_reconcile::{
    create_context, create_element, fmt_number, is_non_dimensional, Child, CommitFlow, Component,
    ComponentContext, ComponentSpec, ComponentType, EventHandler, HaltPolicy, Lifecycle,
    MemoryHost, MemoryNode, Mutation, NativeHost, Options, PropValue, Props, Ref, RefValue,
    RenderConfig, RenderError, Reconciler, State, Updater,
};

type Log = Rc<RefCell<Vec<String>>>;

fn setup() -> (Reconciler<MemoryHost>, MemoryNode) {
    setup_with(RenderConfig::default())
}

fn setup_with(config: RenderConfig) -> (Reconciler<MemoryHost>, MemoryNode) {
    let mut host = MemoryHost::new();
    let container = host.container();
    (Reconciler::with_config(host, config), container)
}

fn el(tag: &str, props: Props, children: Vec<Child>) -> Child {
    create_element(tag, props, children).into()
}

/// Logs mount and update hooks under the `name` prop and renders its
/// children.
struct Logged {
    name: String,
    log: Log,
}

impl Component for Logged {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::DID_MOUNT | Lifecycle::DID_UPDATE | Lifecycle::WILL_UNMOUNT
    }

    fn render(&mut self, props: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
        Ok(props.children())
    }

    fn did_mount(&mut self, _: &mut Updater) -> Result<CommitFlow, RenderError> {
        self.log.borrow_mut().push(format!("mount {}", self.name));
        Ok(CommitFlow::Continue)
    }

    fn did_update(
        &mut self,
        _: &Props,
        _: &State,
        _: Option<&PropValue>,
        _: &mut Updater,
    ) -> Result<CommitFlow, RenderError> {
        self.log.borrow_mut().push(format!("update {}", self.name));
        Ok(CommitFlow::Continue)
    }

    fn will_unmount(&mut self, _: &Updater) -> Result<(), RenderError> {
        self.log.borrow_mut().push(format!("unmount {}", self.name));
        Ok(())
    }
}

fn logged(log: &Log) -> ComponentType {
    let log = log.clone();
    ComponentSpec::class("Logged", move |props, _| Logged {
        name: props.get("name").and_then(PropValue::as_str).unwrap_or("?").to_string(),
        log: log.clone(),
    })
    .build()
}

#[test]
fn test_factory_output_renders_expected_markup() {
    let (mut r, root) = setup();

    r.render(el("div", Props::new().with("class", "a"), vec!["x".into()]), &root).unwrap();

    assert_eq!(r.host().inner_markup(root), r#"<div class="a">x</div>"#);
}

#[test]
fn test_same_descriptor_rediff_is_a_no_op() {
    let log: Log = Rc::default();
    let ty = logged(&log);
    let (mut r, root) = setup();
    let tree = create_element(
        &ty,
        Props::new().with("name", "outer"),
        vec![el("p", Props::new(), vec!["hi".into()])],
    );

    r.render(tree.clone().into(), &root).unwrap();
    let id = r.instances_of(&ty)[0];
    r.host_mut().clear_mutations();
    log.borrow_mut().clear();

    r.render(tree.into(), &root).unwrap();

    assert!(r.host().mutations().is_empty());
    assert!(log.borrow().is_empty());
    assert_eq!(r.instances_of(&ty), vec![id]);
}

#[test]
fn test_equal_trees_are_idempotent() {
    let log: Log = Rc::default();
    let ty = logged(&log);
    let (mut r, root) = setup();
    let build = || {
        create_element(
            &ty,
            Props::new().with("name", "a"),
            vec![el("ul", Props::new(), vec![el("li", Props::new(), vec!["1".into()])])],
        )
    };

    r.render(build().into(), &root).unwrap();
    let first = r.host().inner_markup(root);
    r.render(build().into(), &root).unwrap();

    assert_eq!(r.host().inner_markup(root), first);
    let mounts = log.borrow().iter().filter(|entry| entry.starts_with("mount")).count();
    assert_eq!(mounts, 1);
}

#[test]
fn test_did_mount_runs_child_before_parent() {
    let log: Log = Rc::default();
    let ty = logged(&log);
    let (mut r, root) = setup();
    let tree = create_element(
        &ty,
        Props::new().with("name", "parent"),
        vec![create_element(&ty, Props::new().with("name", "child"), vec![]).into()],
    );

    r.render(tree.into(), &root).unwrap();

    assert_eq!(*log.borrow(), vec!["mount child", "mount parent"]);
}

#[test]
fn test_should_update_false_still_flushes_queued_callbacks() {
    struct Frozen {
        log: Log,
    }
    impl Component for Frozen {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::SHOULD_UPDATE | Lifecycle::WILL_RECEIVE_PROPS
        }
        fn render(&mut self, props: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(props.children())
        }
        fn will_receive_props(
            &mut self,
            _: &Props,
            _: &ComponentContext,
            updater: &mut Updater,
        ) -> Result<(), RenderError> {
            let log = self.log.clone();
            updater.after_commit(move |_| {
                log.borrow_mut().push("flushed".into());
                Ok(CommitFlow::Continue)
            });
            Ok(())
        }
        fn should_update(
            &mut self,
            _: &Props,
            _: &State,
            _: &ComponentContext,
            _: &Updater,
        ) -> Result<bool, RenderError> {
            Ok(false)
        }
    }
    let log: Log = Rc::default();
    let sink = log.clone();
    let ty = ComponentSpec::class("Frozen", move |_, _| Frozen { log: sink.clone() }).build();
    let (mut r, root) = setup();

    r.render(create_element(&ty, Props::new(), vec!["a".into()]).into(), &root).unwrap();
    r.render(create_element(&ty, Props::new(), vec!["b".into()]).into(), &root).unwrap();

    assert_eq!(r.host().inner_markup(root), "a");
    assert_eq!(*log.borrow(), vec!["flushed"]);
}

#[test]
fn test_boundary_claims_descendant_failure() {
    let thrower = ComponentSpec::function("Thrower", |_, _| Err(RenderError::thrown("boom"))).build();
    struct Boundary {
        child: ComponentType,
    }
    impl Component for Boundary {
        fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            match state.get("error").and_then(PropValue::as_str) {
                Some(message) => Ok(create_element("em", Props::new(), vec![message.to_string().into()]).into()),
                None => Ok(create_element(&self.child, Props::new(), vec![]).into()),
            }
        }
    }
    let boundary = {
        let child = thrower.clone();
        ComponentSpec::class("Boundary", move |_, _| Boundary { child: child.clone() })
            .derive_state_from_error(|error| Ok(Some(Props::new().with("error", error.to_string()))))
            .build()
    };
    let (mut r, root) = setup();

    r.render(create_element(&boundary, Props::new(), vec![]).into(), &root).unwrap();
    assert!(r.has_dirty());

    r.render_dirty().unwrap();
    let markup = r.host().inner_markup(root);
    assert!(markup.starts_with("<em>"), "{markup}");
    assert!(markup.contains("boom"), "{markup}");
    assert!(r.instances_of(&thrower).is_empty());
}

#[test]
fn test_unclaimed_failure_reaches_caller() {
    let thrower = ComponentSpec::function("Thrower", |_, _| Err(RenderError::thrown("boom"))).build();
    let (mut r, root) = setup();

    let tree = el("div", Props::new(), vec![create_element(&thrower, Props::new(), vec![]).into()]);
    let result = r.render(tree, &root);

    assert_eq!(result, Err(RenderError::thrown("boom")));
}

#[test]
fn test_style_object_transition() {
    let (mut r, root) = setup();
    let with_style = |style: Props| el("div", Props::new().with("style", style), vec![]);

    r.render(with_style(Props::new().with("color", "red").with("top", 5)), &root).unwrap();
    r.render(with_style(Props::new().with("top", 10)), &root).unwrap();

    let div = r.host().child_nodes(&root)[0];
    assert_eq!(r.host().style(div, "color"), None);
    assert_eq!(r.host().style(div, "top"), Some("10px"));
}

#[test]
fn test_listener_subscription_lifecycle() {
    let (mut r, root) = setup();
    let button = |props: Props| el("button", props, vec![]);
    let count = |r: &Reconciler<MemoryHost>, add: bool| {
        r.host()
            .mutations()
            .iter()
            .filter(|m| match m {
                Mutation::AddListener { .. } => add,
                Mutation::RemoveListener { .. } => !add,
                _ => false,
            })
            .count()
    };
    let first_hits = Rc::new(Cell::new(0));
    let second_hits = Rc::new(Cell::new(0));
    let (a, b) = (first_hits.clone(), second_hits.clone());
    let first = EventHandler::new(move |_| a.set(a.get() + 1));
    let second = EventHandler::new(move |_| b.set(b.get() + 1));

    r.render(button(Props::new().with("onClick", first)), &root).unwrap();
    assert_eq!(count(&r, true), 1);

    r.host_mut().clear_mutations();
    r.render(button(Props::new().with("onClick", second)), &root).unwrap();
    assert_eq!(count(&r, true), 0);
    assert_eq!(count(&r, false), 0);

    let node = r.host().child_nodes(&root)[0];
    assert!(r.dispatch_event(&node, spark_reconcile::Event::new("click")));
    assert_eq!((first_hits.get(), second_hits.get()), (0, 1));

    r.render(button(Props::new()), &root).unwrap();
    assert_eq!(count(&r, false), 1);
    assert!(!r.dispatch_event(&node, spark_reconcile::Event::new("click")));
}

#[test]
fn test_keyed_reorder_moves_native_nodes() {
    let (mut r, root) = setup();
    let list = |keys: &[&str]| {
        el(
            "ul",
            Props::new(),
            keys.iter()
                .map(|key| el("li", Props::new().with("key", *key), vec![(*key).into()]))
                .collect(),
        )
    };

    r.render(list(&["a", "b", "c"]), &root).unwrap();
    let ul = r.host().child_nodes(&root)[0];
    let before = r.host().child_nodes(&ul);
    r.host_mut().clear_mutations();

    r.render(list(&["c", "a", "b"]), &root).unwrap();

    let after = r.host().child_nodes(&ul);
    assert_eq!(after, vec![before[2], before[0], before[1]]);
    assert_eq!(r.host().inner_markup(ul), "<li>c</li><li>a</li><li>b</li>");
    assert!(!r
        .host()
        .mutations()
        .iter()
        .any(|m| matches!(m, Mutation::CreateElement { .. } | Mutation::CreateText { .. })));
}

#[test]
fn test_removed_child_is_unmounted() {
    let log: Log = Rc::default();
    let ty = logged(&log);
    let (mut r, root) = setup();
    let item = |name: &str| -> Child {
        let props = Props::new().with("name", name.to_string()).with("key", name.to_string());
        create_element(&ty, props, vec![name.into()]).into()
    };

    r.render(el("div", Props::new(), vec![item("a"), item("b")]), &root).unwrap();
    log.borrow_mut().clear();
    r.render(el("div", Props::new(), vec![item("b")]), &root).unwrap();

    assert_eq!(*log.borrow(), vec!["unmount a", "update b"]);
    assert_eq!(r.host().inner_markup(root), "<div>b</div>");
}

fn halting(log: &Log) -> ComponentType {
    struct Halting {
        name: String,
        log: Log,
    }
    impl Component for Halting {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::WILL_MOUNT
        }
        fn render(&mut self, _: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(Child::Empty)
        }
        fn will_mount(&mut self, updater: &mut Updater) -> Result<(), RenderError> {
            for (step, flow) in [("1", CommitFlow::Halt), ("2", CommitFlow::Continue)] {
                let log = self.log.clone();
                let entry = format!("{}{step}", self.name);
                updater.after_commit(move |_| {
                    log.borrow_mut().push(entry);
                    Ok(flow)
                });
            }
            Ok(())
        }
    }
    let log = log.clone();
    ComponentSpec::class("Halting", move |props, _| Halting {
        name: props.get("name").and_then(PropValue::as_str).unwrap_or("?").to_string(),
        log: log.clone(),
    })
    .build()
}

#[test]
fn test_halt_policies() {
    let cases = [
        (HaltPolicy::Ignore, vec!["a1", "a2", "b1", "b2"]),
        (HaltPolicy::SkipComponent, vec!["a1", "b1"]),
        (HaltPolicy::AbortFlush, vec!["a1"]),
    ];

    for (policy, expected) in cases {
        let log: Log = Rc::default();
        let ty = halting(&log);
        let (mut r, root) = setup_with(RenderConfig::new().halt_policy(policy));
        let tree = spark_reconcile::fragment(vec![
            create_element(&ty, Props::new().with("name", "a"), vec![]).into(),
            create_element(&ty, Props::new().with("name", "b"), vec![]).into(),
        ]);

        r.render(tree.into(), &root).unwrap();

        assert_eq!(*log.borrow(), expected, "{policy:?}");
    }
}

#[test]
fn test_context_provider_reaches_subscribers() {
    let theme = create_context("light");
    let reader = ComponentSpec::function("Reader", |_, context| {
        let value = context.value().and_then(PropValue::as_str).unwrap_or("?");
        Ok(value.to_string().into())
    })
    .context_type(&theme)
    .build();
    let (mut r, root) = setup();

    r.render(create_element(&reader, Props::new(), vec![]).into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "light");

    let provided = create_element(
        theme.provider(),
        Props::new().with("value", "dark"),
        vec![create_element(&reader, Props::new(), vec![]).into()],
    );
    r.render(provided.into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "dark");
}

#[test]
fn test_provider_change_rerenders_subscriber_behind_bailout() {
    struct Frozen;
    impl Component for Frozen {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::SHOULD_UPDATE
        }
        fn render(&mut self, props: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(props.children())
        }
        fn should_update(
            &mut self,
            _: &Props,
            _: &State,
            _: &ComponentContext,
            _: &Updater,
        ) -> Result<bool, RenderError> {
            Ok(false)
        }
    }
    let theme = create_context("light");
    let reader = ComponentSpec::function("Reader", |_, context| {
        Ok(context.value().and_then(PropValue::as_str).unwrap_or("?").to_string().into())
    })
    .context_type(&theme)
    .build();
    let frozen = ComponentSpec::class("Frozen", |_, _| Frozen).build();
    let (mut r, root) = setup();
    let tree = |value: &str| {
        create_element(
            theme.provider(),
            Props::new().with("value", value.to_string()),
            vec![create_element(
                &frozen,
                Props::new(),
                vec![create_element(&reader, Props::new(), vec![]).into()],
            )
            .into()],
        )
    };

    r.render(tree("dark").into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "dark");

    r.render(tree("dim").into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "dark");
    assert!(r.has_dirty());

    r.render_dirty().unwrap();
    assert_eq!(r.host().inner_markup(root), "dim");
}

#[test]
fn test_callback_ref_attach_and_detach() {
    let seen: Rc<RefCell<Vec<Option<MemoryNode>>>> = Rc::default();
    let sink = seen.clone();
    let node_ref = Ref::callback(move |value: Option<RefValue>| {
        sink.borrow_mut().push(value.and_then(|v| v.native::<MemoryNode>()));
        Ok(())
    });
    let (mut r, root) = setup();

    r.render(el("span", Props::new().with("ref", node_ref), vec![]), &root).unwrap();
    let span = r.host().child_nodes(&root)[0];
    r.render(Child::Empty, &root).unwrap();

    assert_eq!(*seen.borrow(), vec![Some(span), None]);
}

#[test]
fn test_hooks_observe_pass() {
    let commits = Rc::new(Cell::new(0));
    let diffed = Rc::new(Cell::new(0));
    let (c, d) = (commits.clone(), diffed.clone());
    let (mut r, root) = setup();
    r.set_options(
        Options::new()
            .on_commit(move |_, _| c.set(c.get() + 1))
            .on_diffed(move |_| d.set(d.get() + 1)),
    );

    r.render(el("div", Props::new(), vec!["x".into()]), &root).unwrap();

    assert_eq!(commits.get(), 1);
    // Root fragment, div, text.
    assert_eq!(diffed.get(), 3);
}

#[test]
fn test_derived_state_replaces_legacy_prop_hooks() {
    struct Mirror {
        log: Log,
    }
    impl Component for Mirror {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::WILL_MOUNT | Lifecycle::WILL_RECEIVE_PROPS
        }
        fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(state.get("label").and_then(PropValue::as_str).unwrap_or("-").to_string().into())
        }
        fn will_mount(&mut self, _: &mut Updater) -> Result<(), RenderError> {
            self.log.borrow_mut().push("will_mount".into());
            Ok(())
        }
        fn will_receive_props(&mut self, _: &Props, _: &ComponentContext, _: &mut Updater) -> Result<(), RenderError> {
            self.log.borrow_mut().push("will_receive_props".into());
            Ok(())
        }
    }

    let log: Log = Rc::default();
    let sink = log.clone();
    let ty = ComponentSpec::class("Mirror", move |_, _| Mirror { log: sink.clone() })
        .derive_state_from_props(|props, _| {
            Ok(props
                .get("value")
                .and_then(PropValue::as_str)
                .map(|value| Props::new().with("label", format!("derived {value}"))))
        })
        .build();
    let (mut r, root) = setup();

    r.render(create_element(&ty, Props::new().with("value", "a"), vec![]).into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "derived a");

    r.render(create_element(&ty, Props::new().with("value", "b"), vec![]).into(), &root).unwrap();
    assert_eq!(r.host().inner_markup(root), "derived b");
    assert!(log.borrow().is_empty());
}

#[test]
fn test_snapshot_reaches_did_update() {
    struct Scroller {
        seen: Rc<RefCell<Vec<PropValue>>>,
    }
    impl Component for Scroller {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::SNAPSHOT_BEFORE_UPDATE | Lifecycle::DID_UPDATE
        }
        fn render(&mut self, props: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(props.children())
        }
        fn snapshot_before_update(&mut self, prev_props: &Props, _: &State, _: &Updater) -> Result<PropValue, RenderError> {
            Ok(prev_props.get("offset").cloned().unwrap_or(PropValue::Null))
        }
        fn did_update(
            &mut self,
            _: &Props,
            _: &State,
            snapshot: Option<&PropValue>,
            _: &mut Updater,
        ) -> Result<CommitFlow, RenderError> {
            self.seen.borrow_mut().push(snapshot.cloned().unwrap_or(PropValue::Null));
            Ok(CommitFlow::Continue)
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let ty = ComponentSpec::class("Scroller", move |_, _| Scroller { seen: sink.clone() }).build();
    let (mut r, root) = setup();

    r.render(create_element(&ty, Props::new().with("offset", 10), vec![]).into(), &root).unwrap();
    assert!(seen.borrow().is_empty());

    r.render(create_element(&ty, Props::new().with("offset", 20), vec![]).into(), &root).unwrap();
    assert_eq!(*seen.borrow(), vec![PropValue::from(10)]);
}

#[test]
fn test_child_context_reaches_descendants() {
    struct Theme;
    impl Component for Theme {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::CHILD_CONTEXT
        }
        fn render(&mut self, props: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            Ok(props.children())
        }
        fn child_context(&mut self, _: &Updater) -> Result<Props, RenderError> {
            Ok(Props::new().with("theme", "dark"))
        }
    }

    let theme = ComponentSpec::class("Theme", |_, _| Theme).build();
    let reader = ComponentSpec::function("Reader", |_, ctx| {
        Ok(ctx.get("theme").and_then(PropValue::as_str).unwrap_or("none").to_string().into())
    })
    .build();
    let (mut r, root) = setup();

    let tree = el(
        "main",
        Props::new(),
        vec![
            create_element(
                &theme,
                Props::new(),
                vec![el("div", Props::new(), vec![create_element(&reader, Props::new(), vec![]).into()])],
            )
            .into(),
            create_element(&reader, Props::new(), vec![]).into(),
        ],
    );
    r.render(tree, &root).unwrap();

    assert_eq!(r.host().inner_markup(root), "<main><div>dark</div>none</main>");
}

#[test]
fn test_did_catch_boundary_claims_failure() {
    struct Catcher {
        child: ComponentType,
        caught: Log,
    }
    impl Component for Catcher {
        fn lifecycle(&self) -> Lifecycle {
            Lifecycle::DID_CATCH
        }
        fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            if state.get("failed").is_some() {
                return Ok("recovered".into());
            }
            Ok(create_element(&self.child, Props::new(), vec![]).into())
        }
        fn did_catch(&mut self, error: &RenderError, updater: &mut Updater) -> Result<(), RenderError> {
            self.caught.borrow_mut().push(error.to_string());
            updater.set_state(Props::new().with("failed", true));
            Ok(())
        }
    }

    let thrower = ComponentSpec::function("Thrower", |_, _| Err(RenderError::thrown("boom"))).build();
    let caught: Log = Rc::default();
    let sink = caught.clone();
    let catcher = ComponentSpec::class("Catcher", move |_, _| Catcher {
        child: thrower.clone(),
        caught: sink.clone(),
    })
    .build();
    let (mut r, root) = setup();

    r.render(create_element(&catcher, Props::new(), vec![]).into(), &root).unwrap();
    assert_eq!(*caught.borrow(), vec!["boom".to_string()]);

    r.render_dirty().unwrap();
    assert_eq!(r.host().inner_markup(root), "recovered");
}

#[test]
fn test_failing_fallback_escalates_to_outer_boundary() {
    struct Guard {
        child: ComponentType,
        fallback: Option<ComponentType>,
    }
    impl Component for Guard {
        fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            match (state.get("error").and_then(PropValue::as_str), &self.fallback) {
                (None, _) => Ok(create_element(&self.child, Props::new(), vec![]).into()),
                (Some(_), Some(fallback)) => Ok(create_element(fallback, Props::new(), vec![]).into()),
                (Some(message), None) => Ok(el("em", Props::new(), vec![message.to_string().into()])),
            }
        }
    }
    fn guard(name: &'static str, child: ComponentType, fallback: Option<ComponentType>) -> ComponentType {
        ComponentSpec::class(name, move |_, _| Guard {
            child: child.clone(),
            fallback: fallback.clone(),
        })
        .derive_state_from_error(|error| Ok(Some(Props::new().with("error", error.to_string()))))
        .build()
    }

    let thrower = ComponentSpec::function("Thrower", |_, _| Err(RenderError::thrown("boom"))).build();
    let broken = ComponentSpec::function("BrokenFallback", |_, _| Err(RenderError::thrown("fallback failed"))).build();
    let inner = guard("Inner", thrower, Some(broken));
    let outer = guard("Outer", inner.clone(), None);
    let (mut r, root) = setup();

    r.render(create_element(&outer, Props::new(), vec![]).into(), &root).unwrap();

    // The inner fallback fails while the inner boundary handles its own
    // error, so the outer boundary takes it.
    assert_eq!(r.render_dirty().unwrap(), 1);
    assert!(r.has_dirty());
    assert_eq!(r.render_dirty().unwrap(), 1);

    assert_eq!(r.host().inner_markup(root), "<em>fallback failed</em>");
    assert!(r.instances_of(&inner).is_empty());
}

mod property_tests {
    use std::collections::{BTreeMap, HashSet};

    use proptest::prelude::*;

    use super::*;

    const KEYS: [&str; 4] = ["top", "width", "opacity", "zIndex"];

    fn style_map() -> impl Strategy<Value = BTreeMap<&'static str, i32>> {
        proptest::collection::btree_map(proptest::sample::select(KEYS.to_vec()), 0i32..100, 0..4)
    }

    fn to_props(map: &BTreeMap<&'static str, i32>) -> Props {
        map.iter().fold(Props::new(), |props, (key, value)| props.with(*key, *value))
    }

    proptest! {
        #[test]
        fn style_diff_converges(old in style_map(), new in style_map()) {
            let (mut r, root) = setup();
            let render = |r: &mut Reconciler<MemoryHost>, map: &BTreeMap<&'static str, i32>| {
                r.render(el("div", Props::new().with("style", to_props(map)), vec![]), &root)
            };

            render(&mut r, &old).unwrap();
            render(&mut r, &new).unwrap();

            let div = r.host().child_nodes(&root)[0];
            for key in KEYS {
                let expected = new.get(key).map(|value| {
                    let number = fmt_number(f64::from(*value));
                    if is_non_dimensional(key) { number } else { format!("{number}px") }
                });
                prop_assert_eq!(r.host().style(div, key).map(str::to_string), expected);
            }
        }

        #[test]
        fn descriptor_identities_are_unique(count in 1usize..64) {
            let originals: HashSet<u64> = (0..count)
                .map(|i| create_element("i", Props::new().with("n", i as i32), vec![]).original())
                .collect();
            prop_assert_eq!(originals.len(), count);
        }
    }
}
