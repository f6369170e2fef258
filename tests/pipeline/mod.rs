mod classify;
mod diff;
