use std::sync::Arc;

use crate::application::catalog::BlogCatalog;
use crate::application::directory::Directory;
use crate::application::repos::HealthCheck;

#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<BlogCatalog>,
    pub directory: Arc<Directory>,
    pub health: Arc<dyn HealthCheck>,
}
