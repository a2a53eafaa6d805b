//! Whimsical `<adjective>-<noun>` name generation.
//!
//! Used to auto-label a newly discovered session that has no persisted name on
//! disk yet (`names/<sessionId>`, see [`super::ControlDir`]).

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "amber", "ancient", "arid", "auburn", "autumn", "azure", "bashful", "blunt", "bold", "breezy",
    "brisk", "bronze", "bubbly", "calm", "candid", "carefree", "cheerful", "chilly", "chipper",
    "clever", "cloudy", "cobalt", "coral", "cosmic", "crimson", "crisp", "curious", "dapper",
    "dawn", "dazzling", "deft", "dim", "dizzy", "drowsy", "dusty", "eager", "earnest", "echo",
    "electric", "ember", "faint", "feisty", "fickle", "fiery", "fleet", "foggy", "fond",
    "frosty", "gentle", "giddy", "glassy", "gleeful", "golden", "grainy", "grand", "gravel",
    "hasty", "hazy", "hidden", "hollow", "honest", "humble", "icy", "idle", "indigo", "ivory",
    "jagged", "jolly", "jovial", "jumpy", "keen", "lanky", "lazy", "lively", "lonely", "loyal",
    "lucid", "lucky", "mellow", "merry", "misty", "modest", "mossy", "muted", "nimble", "noble",
    "nutty", "olive", "opal", "pale", "patient", "pebbled", "plain", "plucky", "polite",
    "purple", "quiet", "quirky", "radiant",
];

const NOUNS: &[&str] = &[
    "albatross", "anchor", "antler", "badger", "beacon", "beetle", "birch", "bison", "bramble",
    "brook", "canary", "canyon", "cedar", "cinder", "comet", "condor", "cottage", "coyote",
    "crane", "cricket", "current", "dolphin", "dune", "eagle", "ember", "falcon", "fern",
    "ferret", "fjord", "fossil", "fox", "gecko", "glacier", "glade", "goose", "granite",
    "gull", "harbor", "hawk", "heron", "hollow", "hornet", "ibis", "iguana", "inlet", "ivy",
    "jackal", "jasper", "kestrel", "lagoon", "lantern", "lark", "lichen", "lizard", "loon",
    "lynx", "magpie", "mallard", "maple", "marten", "meadow", "mesa", "mink", "moss", "moth",
    "narwhal", "nettle", "newt", "oasis", "ocelot", "orchid", "osprey", "otter", "owl",
    "panther", "pebble", "pelican", "petrel", "pine", "plover", "puffin", "quail", "quarry",
    "rapids", "raven", "reed", "ridge", "robin", "sable", "salamander", "sparrow", "sprig",
    "swallow", "tern", "thicket", "thistle", "thrush", "tundra", "viper", "warbler", "willow",
];

/// Draws a `<adjective>-<noun>` name uniformly at random from the two fixed
/// word lists above.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).expect("ADJECTIVES is non-empty");
    let noun = NOUNS.choose(&mut rng).expect("NOUNS is non-empty");
    format!("{adjective}-{noun}")
}

#[cfg(test)]
#[path = "tests/whimsical_tests.rs"]
mod whimsical_tests;
