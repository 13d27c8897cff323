//! 板块服务

use super::segment;
use crate::client::{ApiClient, ApiError, NO_QUERY};
use crate::models::{PaginatedResponse, Sector, Stock};

#[derive(Clone)]
pub struct SectorService {
    client: ApiClient,
}

impl SectorService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// 板块列表
    pub async fn get_sector_list(&self) -> Result<Vec<Sector>, ApiError> {
        self.client.get_enveloped("/sector/list", NO_QUERY).await
    }

    /// 板块成分股，页码从 1 开始
    pub async fn get_stocks_by_sector(
        &self,
        sector_code: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<PaginatedResponse<Stock>, ApiError> {
        let query = [
            ("page", page.unwrap_or(1)),
            ("page_size", page_size.unwrap_or(20)),
        ];
        self.client
            .get_enveloped(&format!("/sector/{}/stocks", segment(sector_code)), &query)
            .await
    }
}
