pub const DEALER_STATUS_ACTIVE: &str = "ACTIVE";
pub const VEHICLE_STATUS_AVAILABLE: &str = "AVAILABLE";

#[derive(Debug, Clone)]
pub struct Dealer {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub status: String,
}

impl Dealer {
    pub fn is_active(&self) -> bool {
        self.status == DEALER_STATUS_ACTIVE
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: i64,
    pub model_name: String,
    pub variant_name: String,
    pub status: String,
}

impl Vehicle {
    pub fn is_available(&self) -> bool {
        self.status == VEHICLE_STATUS_AVAILABLE
    }
}
