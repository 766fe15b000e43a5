use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use entity_resolution::attribution::{attribute_outcome, Reference};
use entity_resolution::context::{build_entity_context, build_recommendation_context};
use entity_resolution::domain::canonical_lineage_snapshot;
use entity_resolution::model::ResolveContext;
use entity_resolution::store::{EntityStore, StoreSnapshot};
use entity_resolution::{config, observability, InMemoryEntityStore, Resolver};

#[derive(Parser)]
#[command(name = "entityctl", about = "Entity resolution engine CLI")]
struct Cli {
	/// Path to a snapshot file to load before the operation and save after.
	#[arg(long, global = true)]
	snapshot: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Resolve an identifier observation to a canonical entity id.
	Resolve {
		identifier_type: String,
		value: String,
		#[arg(long)]
		confidence: Option<f64>,
		#[arg(long)]
		caused_by: Option<String>,
	},
	/// Bind an additional identifier to an existing entity.
	AddAlias {
		entity_id: String,
		identifier_type: String,
		value: String,
		#[arg(long, default_value_t = 0.95)]
		confidence: f64,
		#[arg(long, default_value = "cli")]
		caused_by: String,
	},
	/// Merge one entity into another.
	Merge {
		from: String,
		to: String,
		#[arg(long, default_value = "manual merge")]
		reason: String,
		#[arg(long, default_value = "cli")]
		caused_by: String,
	},
	/// Undo a previous merge, producing a new merge in the opposite direction.
	UndoMerge {
		from: String,
		to: String,
		#[arg(long, default_value = "cli")]
		caused_by: String,
	},
	/// Attribute an outcome to the best-matching entity given references.
	Attribute {
		/// identifier_type=value pairs, e.g. email=a@example.com
		references: Vec<String>,
	},
	/// Print the full entity context (aliases, identifiers, confidence).
	Context { entity_id: String },
	/// Print the recommendation context for an entity.
	Recommend { entity_id: String },
	/// Print the redirect chain and merge lineage for an entity.
	Lineage { entity_id: String },
	/// Dump the store to stdout as a snapshot document.
	ExportSnapshot,
}

fn load_store(path: &Option<PathBuf>) -> anyhow::Result<Arc<InMemoryEntityStore>> {
	let store = Arc::new(InMemoryEntityStore::new());
	if let Some(path) = path {
		if path.exists() {
			let contents = std::fs::read_to_string(path)?;
			let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
			store.import_snapshot(snapshot)?;
		}
	}
	Ok(store)
}

fn save_store(path: &Option<PathBuf>, store: &InMemoryEntityStore) -> anyhow::Result<()> {
	if let Some(path) = path {
		let snapshot = store.export_snapshot()?;
		let json = serde_json::to_string_pretty(&snapshot)?;
		std::fs::write(path, json)?;
	}
	Ok(())
}

fn parse_references(raw: &[String]) -> anyhow::Result<Vec<Reference>> {
	raw.iter()
		.map(|pair| {
			let (key, value) = pair
				.split_once('=')
				.ok_or_else(|| anyhow::anyhow!("reference '{pair}' must be identifier_type=value"))?;
			Ok(Reference::new(key, value))
		})
		.collect()
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let obs = observability::init_observability().unwrap_or_default();
	let settings = config::load().unwrap_or_default();

	let snapshot_path = cli.snapshot.or_else(|| settings.snapshot_path.clone().map(PathBuf::from));
	let store = load_store(&snapshot_path)?;
	let resolver = Resolver::new(store.clone() as Arc<dyn EntityStore>, settings).with_metrics(obs.metrics);

	let output: serde_json::Value = match cli.command {
		Commands::Resolve {
			identifier_type,
			value,
			confidence,
			caused_by,
		} => {
			let mut ctx = ResolveContext::new();
			if let Some(c) = confidence {
				ctx = ctx.with_confidence(c);
			}
			if let Some(cb) = caused_by {
				ctx = ctx.with_caused_by(cb);
			}
			let resolution = resolver.resolve(&identifier_type, &value, ctx)?;
			serde_json::to_value(resolution)?
		}
		Commands::AddAlias {
			entity_id,
			identifier_type,
			value,
			confidence,
			caused_by,
		} => {
			let events = resolver.add_alias(&entity_id, &identifier_type, &value, confidence, &caused_by, None)?;
			serde_json::to_value(events)?
		}
		Commands::Merge {
			from,
			to,
			reason,
			caused_by,
		} => {
			let event = resolver.merge_entities(&from, &to, &reason, &caused_by)?;
			serde_json::to_value(event)?
		}
		Commands::UndoMerge { from, to, caused_by } => {
			let event = resolver.undo_merge(&from, &to, &caused_by)?;
			serde_json::to_value(event)?
		}
		Commands::Attribute { references } => {
			let refs = parse_references(&references)?;
			let attribution = attribute_outcome(store.as_ref(), &refs)?;
			serde_json::to_value(attribution)?
		}
		Commands::Context { entity_id } => {
			let limit = resolver.settings().recent_evidence_limit;
			let ctx = build_entity_context(store.as_ref(), &entity_id, limit)?;
			serde_json::to_value(ctx)?
		}
		Commands::Recommend { entity_id } => {
			let ctx = build_recommendation_context(store.as_ref(), &entity_id)?;
			serde_json::to_value(ctx)?
		}
		Commands::Lineage { entity_id } => {
			let snapshot = canonical_lineage_snapshot(&resolver, &entity_id)?;
			serde_json::to_value(snapshot)?
		}
		Commands::ExportSnapshot => {
			let snapshot = store.export_snapshot()?;
			serde_json::to_value(snapshot)?
		}
	};

	println!("{}", serde_json::to_string_pretty(&output)?);

	save_store(&snapshot_path, &store)?;
	Ok(())
}
