mod common;
mod locate;
mod scan;
