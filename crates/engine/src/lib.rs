//! Four Meme Engine - Launch strategies, strategy factory, and orchestration

pub mod factory;
pub mod launch;
pub mod strategies;

pub use factory::StrategyFactory;
pub use launch::Engine;
pub use strategies::{
    AntiSniperStrategy, BundleLaunchStrategy, LaunchStrategy, StaggeredLaunchStrategy,
    StrategyKind,
};
