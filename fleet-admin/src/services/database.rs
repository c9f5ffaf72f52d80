use crate::models::{Assignment, Bike, Maintenance, Payment, Rider, Ticket};
use fleet_core::error::AppError;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for fleet-admin");

        let open_only = doc! { "is_open": true };

        create_index(
            &self.riders(),
            doc! { "phone": 1 },
            "rider_phone_unique",
            unique(None),
        )
        .await?;
        create_index(
            &self.riders(),
            doc! { "is_active": 1, "status": 1 },
            "rider_status",
            plain(),
        )
        .await?;

        create_index(
            &self.bikes(),
            doc! { "bike_number": 1 },
            "bike_number_unique",
            unique(None),
        )
        .await?;
        create_index(
            &self.bikes(),
            doc! { "registration_number": 1 },
            "bike_registration_unique",
            unique(None),
        )
        .await?;
        create_index(
            &self.bikes(),
            doc! { "is_active": 1, "status": 1 },
            "bike_status",
            plain(),
        )
        .await?;

        // At most one open assignment per rider and per bike.
        create_index(
            &self.assignments(),
            doc! { "rider_id": 1 },
            "assignment_open_rider",
            unique(Some(open_only.clone())),
        )
        .await?;
        create_index(
            &self.assignments(),
            doc! { "bike_id": 1 },
            "assignment_open_bike",
            unique(Some(open_only)),
        )
        .await?;

        create_index(
            &self.payments(),
            doc! { "assignment_id": 1, "is_active": 1 },
            "payment_assignment",
            plain(),
        )
        .await?;
        create_index(
            &self.payments(),
            doc! { "status": 1, "due_date": 1 },
            "payment_due",
            plain(),
        )
        .await?;

        create_index(
            &self.maintenance(),
            doc! { "bike_id": 1, "status": 1 },
            "maintenance_bike_status",
            plain(),
        )
        .await?;

        create_index(
            &self.tickets(),
            doc! { "status": 1, "priority": 1 },
            "ticket_status_priority",
            plain(),
        )
        .await?;

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn riders(&self) -> Collection<Rider> {
        self.db.collection("riders")
    }

    pub fn bikes(&self) -> Collection<Bike> {
        self.db.collection("bikes")
    }

    pub fn assignments(&self) -> Collection<Assignment> {
        self.db.collection("assignments")
    }

    pub fn payments(&self) -> Collection<Payment> {
        self.db.collection("payments")
    }

    pub fn maintenance(&self) -> Collection<Maintenance> {
        self.db.collection("maintenance")
    }

    pub fn tickets(&self) -> Collection<Ticket> {
        self.db.collection("tickets")
    }

    /// Untyped view of a collection, for aggregation output.
    pub fn raw(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn plain() -> IndexOptions {
    IndexOptions::default()
}

fn unique(partial_filter: Option<Document>) -> IndexOptions {
    IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(partial_filter)
        .build()
}

async fn create_index<T: Send + Sync>(
    collection: &Collection<T>,
    keys: Document,
    name: &str,
    mut options: IndexOptions,
) -> Result<(), AppError> {
    options.name = Some(name.to_string());
    let model = IndexModel::builder().keys(keys).options(options).build();
    collection.create_index(model, None).await.map_err(|e| {
        tracing::error!(
            "Failed to create index {} on {} collection: {}",
            name,
            collection.name(),
            e
        );
        AppError::from(e)
    })?;
    tracing::info!("Created index {}.{}", collection.name(), name);
    Ok(())
}

/// Whether a write failed on a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Map a write error to `Conflict` when it hit a unique index.
pub fn conflict_on_duplicate(err: mongodb::error::Error, message: &str) -> AppError {
    if is_duplicate_key(&err) {
        AppError::Conflict(anyhow::anyhow!("{}", message))
    } else {
        AppError::from(err)
    }
}
