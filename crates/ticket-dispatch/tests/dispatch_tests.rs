//! End-to-end dispatch behaviour over fake collaborators

use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ticket_access::{
    BlacklistRecord, BlacklistStore, GatePipeline, InMemoryBlacklistRepository, StaffAllowlist,
};
use ticket_command::{
    ArgumentKind, ArgumentSpec, CommandDescriptor, CommandRegistry, CommandResolver,
    RegisteredCommand,
};
use ticket_dispatch::{DispatchError, DispatchSettings, Dispatcher};
use ticket_model::{
    Colour, CommandOption, ExternalError, InvocationKind, OptionValue, PermissionLevel,
    PremiumTier, UserId,
};
use ticket_test_utils::{
    authorization, dm_event, guild_event, member, text_tag, user, Behaviour, FakePermissions,
    FakePremium, RecordingExecutor, StaticAliases, TEST_GUILD,
};

struct Harness {
    permissions: Arc<FakePermissions>,
    premium: Arc<FakePremium>,
    blacklist: Arc<BlacklistStore>,
    dispatcher: Dispatcher,
}

fn harness(
    permissions: FakePermissions,
    premium: FakePremium,
    commands: Vec<RegisteredCommand>,
    settings: DispatchSettings,
) -> Harness {
    harness_with_aliases(permissions, premium, commands, settings, StaticAliases::default())
}

fn harness_with_aliases(
    permissions: FakePermissions,
    premium: FakePremium,
    commands: Vec<RegisteredCommand>,
    settings: DispatchSettings,
    aliases: StaticAliases,
) -> Harness {
    let permissions = Arc::new(permissions);
    let premium = Arc::new(premium);

    let mut registry = CommandRegistry::new();
    for command in commands {
        registry.register(command).unwrap();
    }
    let resolver = CommandResolver::new(Arc::new(registry)).with_aliases(Arc::new(aliases));

    let blacklist = Arc::new(BlacklistStore::new(
        Arc::new(InMemoryBlacklistRepository::new()),
        1_000,
    ));
    let gates = GatePipeline::standard(
        Arc::clone(&blacklist),
        Arc::new(StaffAllowlist::default()),
    );

    let dispatcher = Dispatcher::new(
        resolver,
        authorization(Arc::clone(&permissions), Arc::clone(&premium)),
        gates,
        settings,
    );

    Harness {
        permissions,
        premium,
        blacklist,
        dispatcher,
    }
}

fn descriptor(name: &str) -> CommandDescriptor {
    CommandDescriptor::new(name, "test command")
}

#[tokio::test]
async fn direct_message_skips_authorization() {
    let executor = RecordingExecutor::new(
        descriptor("help").contexts([InvocationKind::Guild, InvocationKind::DirectMessage]),
    );
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Admin),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let outcome = h
        .dispatcher
        .dispatch(dm_event("help", user(5, "ada")))
        .await
        .unwrap();
    let reply = outcome.join().await.unwrap();

    assert_eq!(reply.content.as_deref(), Some("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.permissions.calls(), 0);
    assert_eq!(h.premium.calls(), 0);
}

#[tokio::test]
async fn insufficient_permission_never_runs_handler() {
    let executor = RecordingExecutor::new(descriptor("close").permission(PermissionLevel::Support));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    let embed = reply.embed.unwrap();
    assert_eq!(embed.colour, Colour::Red);
    assert!(embed.description.contains("do not have permission"));
    assert!(reply.ephemeral);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blacklisted_guild_is_refused_first() {
    let executor = RecordingExecutor::new(descriptor("close").permission(PermissionLevel::Support));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );
    h.blacklist
        .add_guild(TEST_GUILD, BlacklistRecord::with_reason("abuse"))
        .await
        .unwrap();

    let reply = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    let embed = reply.embed.unwrap();
    assert_eq!(embed.title, "Blacklisted");
    assert!(embed.description.contains("server"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn premium_failure_falls_back_to_no_premium() {
    let executor = RecordingExecutor::new(descriptor("close").permission(PermissionLevel::Support));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Support),
        FakePremium::failing(ExternalError::DeadlineExceeded),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(reply.content.as_deref(), Some("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.premium.calls(), 1);
}

#[tokio::test]
async fn premium_command_denied_without_premium() {
    let executor = RecordingExecutor::new(descriptor("autoclose").premium_only());
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Admin),
        FakePremium::failing(ExternalError::transient("premium service down")),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("autoclose", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(reply.embed.unwrap().title, "Premium Only Command");
}

#[tokio::test]
async fn permission_failure_aborts_with_error_id() {
    let executor = RecordingExecutor::new(descriptor("close"));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::failing(ExternalError::transient("cache unavailable")),
        FakePremium::fixed(PremiumTier::Premium),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    let text = reply.content.unwrap();
    assert!(text.starts_with("An error occurred while processing this request"));
    assert!(text.contains("Error ID"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_authorization_defaults_both_facts() {
    let executor = RecordingExecutor::new(descriptor("close").permission(PermissionLevel::Support));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Admin).delayed(Duration::from_secs(10)),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert!(reply
        .embed
        .unwrap()
        .description
        .contains("do not have permission"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_handler_closes_channel() {
    let executor = RecordingExecutor::new(descriptor("explode")).behaving(Behaviour::Panic);
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let outcome = h
        .dispatcher
        .dispatch(guild_event("explode", member(5, "ada")))
        .await
        .unwrap();
    let task = outcome.task.is_some();

    assert!(task);
    assert_eq!(outcome.join().await, None);

    // The dispatcher keeps serving after a contained panic
    let again = h
        .dispatcher
        .dispatch(guild_event("explode", member(6, "bob")))
        .await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn silent_handler_closes_channel_without_reply() {
    let executor = RecordingExecutor::new(descriptor("noop")).behaving(Behaviour::Silent);
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let outcome = h
        .dispatcher
        .dispatch(guild_event("noop", member(5, "ada")))
        .await
        .unwrap();
    assert_eq!(outcome.join().await, None);
}

#[tokio::test]
async fn failing_handler_gets_single_error_reply() {
    let executor = RecordingExecutor::new(descriptor("broken")).behaving(Behaviour::Fail);
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("broken", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    let embed = reply.embed.unwrap();
    assert_eq!(embed.title, "Error");
    assert!(embed.description.contains("Error ID"));
    assert!(!embed.description.contains("on purpose"));
    assert!(reply.components.is_empty());
}

#[tokio::test(start_paused = true)]
async fn handler_deadline_produces_timeout_reply() {
    let executor = RecordingExecutor::new(descriptor("slow").timeout(Duration::from_secs(3)))
        .behaving(Behaviour::Hang);
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("slow", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert!(reply.embed.unwrap().description.contains("timed out"));
}

#[tokio::test]
async fn context_denial_is_synchronous() {
    let executor = RecordingExecutor::new(descriptor("close"));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Admin),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let outcome = h
        .dispatcher
        .dispatch(dm_event("close", user(5, "ada")))
        .await
        .unwrap();

    assert!(!outcome.should_auto_defer);
    assert!(!outcome.default_ephemeral);
    assert!(outcome.task.is_none());
    let reply = outcome.response().await.unwrap();
    assert_eq!(
        reply.content.as_deref(),
        Some("This command can only be used in servers.")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.permissions.calls(), 0);
}

#[tokio::test]
async fn defer_flags_follow_descriptor() {
    let plain = RecordingExecutor::new(descriptor("plain"));
    let quiet = RecordingExecutor::new(descriptor("quiet").disable_auto_defer().default_ephemeral());
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(plain), RegisteredCommand::new(quiet)],
        DispatchSettings::default(),
    );

    let outcome = h
        .dispatcher
        .dispatch(guild_event("plain", member(5, "ada")))
        .await
        .unwrap();
    assert!(outcome.should_auto_defer);
    assert!(!outcome.default_ephemeral);

    let outcome = h
        .dispatcher
        .dispatch(guild_event("quiet", member(5, "ada")))
        .await
        .unwrap();
    assert!(!outcome.should_auto_defer);
    assert!(outcome.default_ephemeral);
}

#[tokio::test]
async fn premium_only_deployment_drops_free_guilds() {
    let executor = RecordingExecutor::new(descriptor("close"));
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default().with_premium_only(true),
    );

    let outcome = h
        .dispatcher
        .dispatch(guild_event("close", member(5, "ada")))
        .await
        .unwrap();

    assert_eq!(outcome.join().await, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_argument_reply() {
    let executor = RecordingExecutor::new(
        descriptor("add").argument(ArgumentSpec::required("user", ArgumentKind::User)),
    );
    let calls = executor.counter();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("add", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(reply.content.as_deref(), Some("argument is missing"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn bound_arguments_reach_handler() {
    let executor = RecordingExecutor::new(
        descriptor("add").argument(ArgumentSpec::required("user", ArgumentKind::User)),
    );
    let seen = executor.arguments();
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        vec![RegisteredCommand::new(executor)],
        DispatchSettings::default(),
    );

    let event = guild_event("add", member(5, "ada"))
        .with_options(vec![CommandOption::value("user", OptionValue::User(UserId(77)))]);
    h.dispatcher.dispatch(event).await.unwrap().join().await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].user("user").map(|u| u.get()), Some(77));
}

#[tokio::test]
async fn unknown_command_is_a_dispatch_error() {
    let h = harness(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        Vec::new(),
        DispatchSettings::default(),
    );

    let err = h
        .dispatcher
        .dispatch(guild_event("nope", member(5, "ada")))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Resolve(_)));
    assert_eq!(
        err.to_envelope().content.as_deref(),
        Some("command nope does not exist")
    );
}

#[tokio::test]
async fn tag_alias_dispatches_tag_body() {
    let aliases = StaticAliases::default().with_tag(TEST_GUILD, 1, text_tag("rules", "Be nice"));
    let h = harness_with_aliases(
        FakePermissions::fixed(PermissionLevel::Everyone),
        FakePremium::default(),
        Vec::new(),
        DispatchSettings::default(),
        aliases,
    );

    let reply = h
        .dispatcher
        .dispatch(guild_event("rules", member(5, "ada")))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(reply.content.as_deref(), Some("Be nice"));
    assert!(!reply.ephemeral);
}
