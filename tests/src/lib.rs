//! End-to-end scan scenarios, run with stub collaborators.

#[cfg(test)]
mod scan;
#[cfg(test)]
mod stubs;
