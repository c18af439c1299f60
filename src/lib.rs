pub mod animations_utils;
pub mod assets;
pub mod camera;
pub mod companion;
pub mod game;
pub mod player;

// Re-export commonly used items
pub use game::GamePlugin;
