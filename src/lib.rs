//! Reads EGA dataset metadata tarballs into an in-memory [`archive::Archive`].
//!
//! The tarball at `{api_url}/metadata/{dataset_id}` is fetched with bounded
//! retries, gunzipped and walked entry by entry. `*.map` files become row
//! lists and descriptor XML under `xmls/{study,samples,experiments,runs,analysis}/`
//! becomes JSON trees, keyed by the id taken from the file name.

pub mod archive;
pub mod classify;
pub mod config;
pub mod daco;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod io_util;
pub mod mapping;
pub mod markup;
pub mod output;
pub mod reader;
pub mod resolver;
pub mod runs;
