//! End-to-end behaviour of the event layer through [`EventsCore`]

use crate::events::*;
use crate::*;
use std::sync::{Arc, Mutex};

struct NullHost;

impl HostServices for NullHost {
    fn reload_server_name(&self) {}

    fn apply_spawn_role(&self, _player: &PlayerRef, _role: RoleType) {}
}

type CallLog = Arc<Mutex<Vec<String>>>;

fn new_core(config: EventsConfig, table: Arc<HookTable>) -> (EventsCore, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::new());
    let core = EventsCore::new(config, table, Arc::new(NullHost), diagnostics.clone());
    (core, diagnostics)
}

fn plugin(name: &str, priority: PluginPriority, subscribers: AutoSubscribers) -> Arc<dyn PluginRecord> {
    Arc::new(BasicPlugin::new(name, priority, subscribers))
}

fn drop_tracker(tag: &'static str, log: &CallLog) -> Handler<ItemDroppedEventArgs> {
    let log = log.clone();
    Handler::new(tag, move |ev: &mut ItemDroppedEventArgs| {
        log.lock().unwrap().push(format!("{}:{:?}", tag, ev.pickup));
        Ok(())
    })
}

fn ada() -> PlayerRef {
    PlayerRef::new(2, "Ada", "ada@steam")
}

#[test_log::test]
fn manual_then_auto_handlers_share_one_payload_in_binding_order() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let log: CallLog = Arc::default();

    let manual_log = log.clone();
    core.handlers().server.round_ended.subscribe(Handler::new("M", move |ev: &mut RoundEndedEventArgs| {
        manual_log.lock().unwrap().push(format!("M saw {}", ev.timer_to_restart));
        ev.timer_to_restart = -1;
        Ok(())
    }));

    let auto_log = log.clone();
    let auto = AutoSubscribers::new().on(Handler::new("A", move |ev: &mut RoundEndedEventArgs| {
        auto_log.lock().unwrap().push(format!("A saw {}", ev.timer_to_restart));
        Ok(())
    }));
    core.on_enable(&StaticPluginDirectory::new(vec![plugin("a", PluginPriority::Medium, auto)]))
        .unwrap();

    let restart_in = core
        .interceptors()
        .round_ended(LeadingTeam::Draw, RoundSummary::default(), 10);

    assert_eq!(*log.lock().unwrap(), vec!["M saw 10", "A saw -1"]);
    assert_eq!(restart_in, -1);
    assert_eq!(
        core.handlers().server.round_ended.handler_names(),
        vec![("M".to_string(), Origin::Manual), ("A".to_string(), Origin::Auto)]
    );
}

#[test]
fn a_manual_veto_is_visible_to_later_auto_handlers() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let observed = Arc::new(Mutex::new(None));

    core.handlers().server.ending_round.subscribe(Handler::new("M", |ev: &mut EndingRoundEventArgs| {
        ev.is_allowed = false;
        Ok(())
    }));
    let seen = observed.clone();
    let auto = AutoSubscribers::new().on(Handler::new("A", move |ev: &mut EndingRoundEventArgs| {
        *seen.lock().unwrap() = Some(ev.is_allowed);
        Ok(())
    }));
    core.on_enable(&StaticPluginDirectory::new(vec![plugin("a", PluginPriority::Medium, auto)]))
        .unwrap();

    let ends = core
        .interceptors()
        .ending_round(RoundSummary { mtf: 3, ..Default::default() }, true);

    assert!(!ends);
    assert_eq!(*observed.lock().unwrap(), Some(false));
}

#[test]
fn two_plugins_on_item_dropped_come_and_go_without_touching_manual_bindings() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let log: CallLog = Arc::default();

    let manual = drop_tracker("manual", &log);
    core.handlers().player.item_dropped.subscribe(manual.clone());

    let directory = StaticPluginDirectory::new(vec![
        plugin("first", PluginPriority::Medium, AutoSubscribers::new().on(drop_tracker("first", &log))),
        plugin("second", PluginPriority::Medium, AutoSubscribers::new().on(drop_tracker("second", &log))),
    ]);
    core.on_enable(&directory).unwrap();

    let channel = &core.handlers().player.item_dropped;
    assert_eq!(channel.count_origin(Origin::Auto), 2);

    core.on_disable().unwrap();

    let channel = &core.handlers().player.item_dropped;
    assert_eq!(channel.count_origin(Origin::Auto), 0);
    assert_eq!(channel.handler_names(), vec![("manual".to_string(), Origin::Manual)]);

    channel.publish(&mut ItemDroppedEventArgs { player: ada(), pickup: ItemType::Radio });
    assert_eq!(*log.lock().unwrap(), vec!["manual:Radio"]);
}

#[test]
fn higher_priority_plugins_are_bound_first() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let log: CallLog = Arc::default();

    let directory = StaticPluginDirectory::new(vec![
        plugin("low", PluginPriority::Low, AutoSubscribers::new().on(drop_tracker("low", &log))),
        plugin("first", PluginPriority::First, AutoSubscribers::new().on(drop_tracker("first", &log))),
    ]);
    core.on_enable(&directory).unwrap();

    core.interceptors().item_dropped(ada(), ItemType::Medkit);

    assert_eq!(*log.lock().unwrap(), vec!["first:Medkit", "low:Medkit"]);
}

#[test]
fn configured_exclusion_leaves_that_point_uninstalled() {
    let table = Arc::new(HookTable::new());
    let config = EventsConfig::from_toml_str(
        r#"
        [[disabled_patches]]
        target = "HostRoundManager"
        member = "EndRound"
        "#,
    )
    .unwrap();
    let (mut core, _) = new_core(config, table.clone());

    core.on_enable(&StaticPluginDirectory::default()).unwrap();

    assert!(!table.is_active("HostRoundManager", "EndRound"));
    let others = interception_catalog()
        .into_iter()
        .filter(|p| p.target != PatchTarget::new("HostRoundManager", "EndRound"));
    for point in others {
        assert!(table.is_active(&point.target.target, &point.target.member));
    }
}

#[test]
fn reload_cycles_use_fresh_identities_and_restore_the_same_bindings() {
    let table = Arc::new(HookTable::new());
    let (mut core, _) = new_core(EventsConfig::default(), table.clone());
    let log: CallLog = Arc::default();
    let directory = StaticPluginDirectory::new(vec![
        plugin("first", PluginPriority::Medium, AutoSubscribers::new().on(drop_tracker("first", &log))),
        plugin("second", PluginPriority::High, AutoSubscribers::new().on(drop_tracker("second", &log))),
    ]);

    core.on_enable(&directory).unwrap();
    let baseline = core.subscriptions().bindings();
    let mut epochs = vec![core.patches().epoch()];

    for _ in 0..4 {
        core.on_disable().unwrap();
        assert_eq!(table.installed_count(), 0);
        assert!(core.subscriptions().is_empty());

        core.on_enable(&directory).unwrap();
        epochs.push(core.patches().epoch());
        assert_eq!(core.subscriptions().bindings(), baseline);
    }

    assert!(epochs.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(core.handlers().player.item_dropped.count_origin(Origin::Auto), 2);
    assert_eq!(core.registry().len(), 16);
}

#[test]
fn resolving_again_without_unresolve_adds_nothing() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let log: CallLog = Arc::default();
    let directory = StaticPluginDirectory::new(vec![plugin(
        "only",
        PluginPriority::Medium,
        AutoSubscribers::new().on(drop_tracker("only", &log)),
    )]);

    core.on_enable(&directory).unwrap();
    let report = core.resolve(&directory);

    assert_eq!(report.bound, 0);
    assert_eq!(report.already_bound, 1);
    assert_eq!(core.handlers().player.item_dropped.count_origin(Origin::Auto), 1);
}

#[test]
fn zero_payload_channels_are_skipped_by_discovery_but_still_dispatch() {
    let (mut core, _) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    core.on_enable(&StaticPluginDirectory::default()).unwrap();

    let unkeyed: Vec<&DiscoveryError> = core
        .registry()
        .skipped()
        .iter()
        .filter(|e| matches!(e, DiscoveryError::Unkeyed { .. }))
        .collect();
    assert_eq!(unkeyed.len(), 3);

    core.interceptors().waiting_for_players();
    assert_eq!(core.handlers().server.waiting_for_players.stats().published, 1);
}

#[test]
fn publishing_to_an_unbound_channel_changes_nothing() {
    let (core, diagnostics) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));

    assert!(core.interceptors().kicking(ada(), PlayerRef::server(), "afk"));
    assert_eq!(core.handlers().player.kicking.stats(), ChannelStats::default());
    assert!(diagnostics.entries().is_empty());
}

#[test]
fn one_crashing_plugin_does_not_starve_the_others() {
    let (mut core, diagnostics) = new_core(EventsConfig::default(), Arc::new(HookTable::new()));
    let log: CallLog = Arc::default();

    let crashing = AutoSubscribers::new().on(Handler::new(
        "crash",
        |_: &mut ItemDroppedEventArgs| -> Result<()> { panic!("index out of range") },
    ));
    let directory = StaticPluginDirectory::new(vec![
        plugin("crashy", PluginPriority::High, crashing),
        plugin("steady", PluginPriority::Medium, AutoSubscribers::new().on(drop_tracker("steady", &log))),
    ]);
    core.on_enable(&directory).unwrap();

    for _ in 0..3 {
        core.interceptors().item_dropped(ada(), ItemType::Ammo9);
    }

    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(diagnostics.errors().len(), 3);
    assert_eq!(core.handlers().player.item_dropped.stats().handler_failures, 3);
}
