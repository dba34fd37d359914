#[cfg(unix)]
mod queries;
#[cfg(unix)]
mod supervisor;
