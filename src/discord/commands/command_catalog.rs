// Discord commands module.
// Each feature gets its own command file.

use crate::discord::{Data, Error};

pub mod antirp;

pub mod freshmeat;

pub mod githubcards;

pub mod massmove;

pub mod sentryio;

/// Every command the framework registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        antirp::antirp(),
        freshmeat::freshmeat(),
        githubcards::githubcards(),
        githubcards::ghsearch(),
        massmove::massmove(),
        sentryio::sentryio(),
    ]
}
