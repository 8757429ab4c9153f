//! Staging goals for nexstage.
//!
//! Each `ops_*` module implements one goal on top of the core types and the
//! repository manager client. [`strategy`] and [`lifecycle`] hold the deploy
//! strategies and the staging repository lifecycle they share.

pub mod lifecycle;
pub mod local_stage;
pub mod ops_deploy;
pub mod ops_deploy_image;
pub mod ops_deploy_staged;
pub mod ops_finish;
pub mod ops_rc;
pub mod session;
pub mod strategy;
