//! Dictionary for the word-based naming scheme.

/// Title-case English words combined into meeting identifiers like
/// `PlayfulDragonsObserve`.
pub(super) const WORDS: &[&str] = &[
    "Amber", "Ancient", "Autumn", "Bold", "Brave", "Bright", "Calm", "Cheerful", "Clever",
    "Cosmic", "Crimson", "Curious", "Daring", "Dreamy", "Eager", "Electric", "Emerald", "Fearless",
    "Fierce", "Gentle", "Gleaming", "Golden", "Graceful", "Happy", "Hidden", "Humble", "Jolly",
    "Keen", "Lively", "Lucky", "Majestic", "Mellow", "Mighty", "Noble", "Peaceful", "Playful",
    "Polite", "Proud", "Quiet", "Radiant", "Rapid", "Silent", "Silver", "Sincere", "Swift",
    "Tranquil", "Vivid", "Wandering", "Wise", "Witty",
    "Badgers", "Bears", "Beavers", "Condors", "Cranes", "Dolphins", "Dragons", "Eagles",
    "Falcons", "Foxes", "Gazelles", "Herons", "Horses", "Lions", "Lynxes", "Magpies", "Otters",
    "Owls", "Pandas", "Panthers", "Parrots", "Penguins", "Rabbits", "Ravens", "Salmons", "Seals",
    "Sparrows", "Squirrels", "Swans", "Tigers", "Turtles", "Whales", "Wolves", "Wombats", "Zebras",
    "Arrive", "Assemble", "Celebrate", "Converse", "Dance", "Debate", "Discover", "Dream",
    "Explore", "Gather", "Imagine", "Improvise", "Inquire", "Laugh", "Listen", "Meander",
    "Observe", "Ponder", "Prosper", "Reflect", "Rejoice", "Travel", "Wander", "Whisper", "Wonder",
];
