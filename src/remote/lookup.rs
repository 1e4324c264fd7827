//! Multi-candidate remote lookup
//!
//! A library's internal folder name often differs from its display name, so
//! a single guessed URL misses files that are there. The lookup tries an
//! ordered, configurable list of candidates and takes the first hit. Every
//! attempt is read-only; a failing candidate is logged and skipped.

use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{join_url, RemoteStore};
use crate::logging::*;
use crate::strategies::CandidateRule;
use crate::types::{DestinationPath, RemoteFileInfo};

/// Result of resolving one destination path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
	Found(RemoteFileInfo),
	NotFound,
}

impl LookupOutcome {
	pub fn found(&self) -> Option<&RemoteFileInfo> {
		match self {
			LookupOutcome::Found(info) => Some(info),
			LookupOutcome::NotFound => None,
		}
	}
}

/// One concrete lookup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
	/// Fetch a file by URL
	Url(String),
	/// Open a folder, then fetch a file by name inside it
	InFolder { folder: String, name: String },
}

impl std::fmt::Display for Candidate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Candidate::Url(url) => write!(f, "{}", url),
			Candidate::InFolder { folder, name } => write!(f, "{} -> {}", folder, name),
		}
	}
}

/// Resolves destination paths against a store
pub struct RemoteLookup {
	store: Arc<dyn RemoteStore>,
	rules: Vec<CandidateRule>,
	aliases: Vec<String>,
	display_name: OnceCell<Option<String>>,
}

impl RemoteLookup {
	pub fn new(store: Arc<dyn RemoteStore>, rules: Vec<CandidateRule>, aliases: Vec<String>) -> Self {
		RemoteLookup { store, rules, aliases, display_name: OnceCell::new() }
	}

	/// Lookup with the default candidate order and the given aliases
	pub fn with_defaults(store: Arc<dyn RemoteStore>, aliases: Vec<String>) -> Self {
		RemoteLookup::new(store, CandidateRule::default_order(), aliases)
	}

	/// Library display name, fetched once; `None` if it cannot be resolved
	async fn display_name(&self) -> Option<&str> {
		self.display_name
			.get_or_init(|| async {
				match self.store.library_display_name().await {
					Ok(name) => Some(name),
					Err(e) => {
						warn!("Library display name unavailable, skipping that candidate: {}", e);
						None
					}
				}
			})
			.await
			.as_deref()
	}

	/// Candidates for a destination, in order, without duplicates
	pub async fn candidates(&self, destination: &DestinationPath) -> Vec<Candidate> {
		let dest = destination.as_url_path();
		let mut out: Vec<Candidate> = Vec::new();
		let mut push = |c: Candidate| {
			if !out.contains(&c) {
				out.push(c);
			}
		};

		for rule in &self.rules {
			match rule {
				CandidateRule::Direct => push(Candidate::Url(join_url(&[self.store.library_root(), &dest]))),
				CandidateRule::LibraryDisplayName => {
					if let Some(name) = self.display_name().await {
						push(Candidate::Url(join_url(&[name, &dest])));
					}
				}
				CandidateRule::Aliases => {
					for alias in &self.aliases {
						push(Candidate::Url(join_url(&[alias, &dest])));
					}
				}
				CandidateRule::Prefix(prefix) => push(Candidate::Url(join_url(&[prefix, &dest]))),
				CandidateRule::Raw => push(Candidate::Url(join_url(&[&dest]))),
				CandidateRule::FolderNavigation => {
					if let Some(name) = destination.file_name() {
						let parent = destination.parent().as_url_path();
						push(Candidate::InFolder {
							folder: join_url(&[self.store.library_root(), &parent]),
							name: name.to_string(),
						});
					}
				}
			}
		}
		out
	}

	/// Try every candidate in order; NotFound once they are exhausted
	pub async fn resolve(&self, destination: &DestinationPath) -> LookupOutcome {
		let candidates = self.candidates(destination).await;
		let mut errors = 0;

		for candidate in &candidates {
			let attempt = match candidate {
				Candidate::Url(url) => self.store.get_file(url).await,
				Candidate::InFolder { folder, name } => self.store.get_file_in_folder(folder, name).await,
			};
			match attempt {
				Ok(info) => {
					trace!("Resolved {} via {}", destination, candidate);
					return LookupOutcome::Found(info);
				}
				Err(e) if e.is_not_found() => {}
				Err(e) => {
					errors += 1;
					debug!("Lookup candidate {} failed: {}", candidate, e);
				}
			}
		}

		if errors > 0 && errors == candidates.len() {
			warn!("Every lookup candidate for {} failed; treating as not found", destination);
		}
		LookupOutcome::NotFound
	}
}


// vim: ts=4
