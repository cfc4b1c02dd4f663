//! Slack Socket Mode runtime for the threadsweep moderation bot.
//!
//! Connects to Slack, turns mentions, the delete-thread message shortcut and
//! the sweep slash command into engine invocations, and reports results back
//! to the requesting user as ephemeral messages.

pub mod slack_runtime;

pub use slack_runtime::{
    run_slack_sweeper, SlackApiClient, SlackCredentials, SlackSweepRuntimeConfig,
};
