mod control;
mod progress;
