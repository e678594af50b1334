mod cli_run;
mod config_loading;
mod simulated_backend;
