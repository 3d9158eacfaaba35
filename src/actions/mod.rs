pub mod run_actions;
