pub mod db;
pub mod earnings;
pub mod instructors;
pub mod orders;
pub mod payouts;
pub mod schedule;

use db::Db;
use earnings::EarningsStore;
use eyre::Result;
use instructors::InstructorStore;
use orders::OrderStore;
use payouts::PayoutStore;
use schedule::ScheduleStore;

const DB_NAME: &str = "payouts_db";

#[derive(Clone)]
pub struct Storage {
    pub orders: OrderStore,
    pub earnings: EarningsStore,
    pub instructors: InstructorStore,
    pub payouts: PayoutStore,
    pub schedule: ScheduleStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::connect(uri, DB_NAME).await?;
        let orders = OrderStore::new(&db).await?;
        let earnings = EarningsStore::new(&db).await?;
        let instructors = InstructorStore::new(&db);
        let payouts = PayoutStore::new(&db).await?;
        let schedule = ScheduleStore::new(&db);

        Ok(Storage {
            orders,
            earnings,
            instructors,
            payouts,
            schedule,
        })
    }
}
