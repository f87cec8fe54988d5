//! Shared test harness modules for the pagesync CLI.

use super::*;

mod helpers;
