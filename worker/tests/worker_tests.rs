//! Assembled worker over fixture-seeded collaborators

use pretty_assertions::assert_eq;
use std::sync::Arc;
use ticket_model::{
    Colour, CommandOption, GuildId, InteractionEvent, OptionValue, RoleId, UserId,
};
use ticket_test_utils::member;
use ticket_worker::fixture::FIRST_CREATED_ROLE;
use ticket_worker::{BuildError, Fixture, FixtureServices, Worker, WorkerConfig};

const GUILD: GuildId = GuildId(500);
const SUPPORT: u64 = 42;
const ADMIN: u64 = 1;
const TEAM_ROLE: RoleId = RoleId(700);

async fn worker() -> Worker {
    let raw = include_str!("../../fixtures/guild.json");
    let fixture: Fixture = serde_json::from_str(raw).unwrap();
    let services = Arc::new(FixtureServices::seed(fixture).await.unwrap());

    let mut config = WorkerConfig::default();
    config.bot.admins = vec![UserId(ADMIN)];
    Worker::build(&config, services).unwrap()
}

fn event(name: &str, user: u64) -> InteractionEvent {
    InteractionEvent::in_guild(1, name, GUILD, member(user, "grace"))
}

fn admin(subcommand: &str, options: Vec<CommandOption>) -> InteractionEvent {
    event("admin", ADMIN).with_options(vec![CommandOption::subcommand(subcommand, options)])
}

fn text(name: &str, value: &str) -> CommandOption {
    CommandOption::value(name, OptionValue::String(value.to_owned()))
}

#[tokio::test]
async fn on_call_toggle_creates_and_removes_roles() {
    let worker = worker().await;
    let guild_role = RoleId(FIRST_CREATED_ROLE);

    let on = worker.replay(event("on-call", SUPPORT)).await;
    assert!(on.default_ephemeral);
    let embed = on.response.unwrap().embed.unwrap();
    assert_eq!(embed.colour, Colour::Green);
    assert!(embed.description.contains("now on call"));
    assert!(worker.services().has_role(GUILD, UserId(SUPPORT), guild_role));
    assert!(worker.services().has_role(GUILD, UserId(SUPPORT), TEAM_ROLE));
    assert_eq!(worker.services().on_call().guild_role(GUILD), Some(guild_role));

    let off = worker.replay(event("on-call", SUPPORT)).await;
    assert!(off
        .response
        .unwrap()
        .embed
        .unwrap()
        .description
        .contains("no longer on call"));
    assert!(!worker.services().has_role(GUILD, UserId(SUPPORT), guild_role));
    assert!(!worker.services().has_role(GUILD, UserId(SUPPORT), TEAM_ROLE));
}

#[tokio::test]
async fn on_call_recreates_deleted_role() {
    let worker = worker().await;
    let first = RoleId(FIRST_CREATED_ROLE);

    worker.replay(event("on-call", SUPPORT)).await;
    worker.replay(event("on-call", SUPPORT)).await;
    worker.services().delete_role(GUILD, first);

    let outcome = worker.replay(event("on-call", SUPPORT)).await;
    assert_eq!(outcome.response.unwrap().embed.unwrap().colour, Colour::Green);

    let second = RoleId(FIRST_CREATED_ROLE + 1);
    assert!(worker.services().has_role(GUILD, UserId(SUPPORT), second));
    assert_eq!(worker.services().on_call().guild_role(GUILD), Some(second));
}

#[tokio::test]
async fn on_call_requires_support() {
    let worker = worker().await;

    let outcome = worker.replay(event("on-call", 7)).await;
    let embed = outcome.response.unwrap().embed.unwrap();

    assert!(embed.description.contains("do not have permission"));
    assert!(!worker.services().on_call().is_on_call(GUILD, UserId(7)));
}

#[tokio::test]
async fn tag_alias_replies_publicly() {
    let worker = worker().await;

    let event = InteractionEvent::in_guild(9001, "rules", GUILD, member(7, "ada"));
    let response = worker.replay(event).await.response.unwrap();

    assert!(!response.ephemeral);
    assert_eq!(
        response.content.as_deref(),
        Some("Please read #rules before opening a ticket.")
    );
}

#[tokio::test]
async fn globally_blacklisted_user_is_refused() {
    let worker = worker().await;

    let event = InteractionEvent::in_guild(9001, "rules", GUILD, member(666, "mallory"));
    let embed = worker.replay(event).await.response.unwrap().embed.unwrap();

    assert_eq!(embed.title, "Blacklisted");
    assert!(embed.description.contains("You are blacklisted"));
}

#[tokio::test]
async fn admin_blacklists_guild() {
    let worker = worker().await;

    let outcome = worker
        .replay(admin(
            "blacklist",
            vec![text("guild_id", "777"), text("reason", "raid"), text("real_owner_id", "88")],
        ))
        .await;
    let response = outcome.response.unwrap();
    let embed = response.embed.unwrap();
    assert!(!response.ephemeral);
    assert!(embed.description.contains("blacklisted successfully"));
    assert!(embed.description.contains("**Reason:** raid"));
    assert!(embed.description.contains("Unknown (bot not in server)"));
    assert!(embed.description.contains("**Real Owner:** <@88>"));

    let again = worker
        .replay(admin("blacklist", vec![text("guild_id", "777")]))
        .await;
    assert!(again
        .response
        .unwrap()
        .embed
        .unwrap()
        .description
        .contains("already blacklisted"));

    let counts = worker
        .replay(admin(
            "owner-counts",
            vec![CommandOption::value("user", OptionValue::User(UserId(88)))],
        ))
        .await;
    assert!(counts
        .response
        .unwrap()
        .embed
        .unwrap()
        .description
        .contains("real owner of 1"));

    let blocked = worker
        .replay(InteractionEvent::in_guild(
            1,
            "on-call",
            GuildId(777),
            member(SUPPORT, "grace"),
        ))
        .await;
    assert_eq!(blocked.response.unwrap().embed.unwrap().title, "Blacklisted");

    let removed = worker
        .replay(admin("unblacklist", vec![text("guild_id", "777")]))
        .await;
    assert_eq!(removed.response.unwrap().embed.unwrap().colour, Colour::Green);
}

#[tokio::test]
async fn admin_rejects_bad_ids_and_non_admins() {
    let worker = worker().await;

    let bad = worker
        .replay(admin("blacklist", vec![text("guild_id", "not-a-number")]))
        .await;
    assert_eq!(
        bad.response.unwrap().embed.unwrap().description,
        "Invalid guild ID provided"
    );

    let outsider = worker
        .replay(
            event("admin", SUPPORT).with_options(vec![CommandOption::subcommand(
                "unblacklist",
                vec![text("guild_id", "777")],
            )]),
        )
        .await;
    assert!(outsider
        .response
        .unwrap()
        .embed
        .unwrap()
        .description
        .contains("reserved for the bot owner"));
}

#[tokio::test]
async fn unknown_command_reports_dispatch_error() {
    let worker = worker().await;

    let outcome = worker.replay(event("nope", SUPPORT)).await;

    assert_eq!(outcome.error.as_deref(), Some("command nope does not exist"));
    assert!(!outcome.should_auto_defer);
}

#[tokio::test]
async fn registry_listing() {
    let worker = worker().await;
    let commands = worker.commands();

    let names: Vec<_> = commands.iter().map(|c| c.descriptor.name.as_str()).collect();
    assert_eq!(names, ["on-call", "admin"]);
    assert_eq!(commands[1].children.len(), 3);

    let rendered = commands[1].render(0);
    assert!(rendered.starts_with("admin [everyone] 10000ms admin-only"));
    assert!(rendered.contains("\n  blacklist [everyone]"));

    let json = serde_json::to_value(&commands[0]).unwrap();
    assert_eq!(json["name"], "on-call");
    assert_eq!(json["permission_level"], "support");
    assert_eq!(json["timeout"], 8000);
}

#[tokio::test]
async fn authorization_deadline_must_be_shorter_than_every_command() {
    let services = Arc::new(FixtureServices::seed(Fixture::default()).await.unwrap());
    let mut config = WorkerConfig::default();
    config.dispatch.authorization_timeout_ms = 9_000;

    let err = Worker::build(&config, services).unwrap_err();

    assert!(matches!(err, BuildError::Config(_)));
    assert!(err.to_string().contains("on-call"));
}
