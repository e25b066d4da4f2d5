#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use chrono::Utc;
use restaurant_reviews::{
    AppResult, AppState, BcryptHasher, HasherState, Repository, RepositoryState,
    config::AppConfig,
    create_router,
    error::AppError,
    models::{
        Account, AccountChanges, CreateRestaurantRequest, CreateReviewRequest, NewAccount,
        Restaurant, Review, Role, UpdateRestaurantRequest, UpdateReviewRequest,
    },
    token::SessionSubject,
};
use tower::ServiceExt;

// --- IN-MEMORY REPOSITORY ---

// Behaves like the Postgres repository: unique usernames, cascading deletes, averages
// refreshed on every review write, id-ordered listings.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    next_id: i32,
    accounts: Vec<Account>,
    restaurants: Vec<Restaurant>,
    reviews: Vec<Review>,
}

impl Store {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn refresh_average(&mut self, restaurant_id: i32) {
        let ratings: Vec<f64> = self
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id)
            .map(|r| r.rating)
            .collect();
        let average = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };
        if let Some(restaurant) = self.restaurants.iter_mut().find(|r| r.id == restaurant_id) {
            restaurant.average_rating = average;
        }
    }
}

fn window<T: Clone>(items: &[T], skip: i64, take: i64) -> (Vec<T>, i64) {
    let page = items
        .iter()
        .skip(skip.max(0) as usize)
        .take(take.max(0) as usize)
        .cloned()
        .collect();
    (page, items.len() as i64)
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.store.lock().unwrap().accounts.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_account_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let store = self.store.lock().unwrap();
        Ok(store.accounts.iter().find(|a| a.username == username).cloned())
    }

    async fn find_account(&self, id: i32) -> AppResult<Option<Account>> {
        let store = self.store.lock().unwrap();
        Ok(store.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let mut store = self.store.lock().unwrap();
        if store.accounts.iter().any(|a| a.username == account.username) {
            return Err(AppError::DuplicateAccount);
        }
        let created = Account {
            id: store.next_id(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
        };
        store.accounts.push(created.clone());
        Ok(created)
    }

    async fn list_accounts(&self, skip: i64, take: i64) -> AppResult<(Vec<Account>, i64)> {
        let store = self.store.lock().unwrap();
        Ok(window(&store.accounts, skip, take))
    }

    async fn update_account(&self, id: i32, changes: AccountChanges) -> AppResult<Option<Account>> {
        let mut store = self.store.lock().unwrap();
        if let Some(username) = &changes.username {
            if store.accounts.iter().any(|a| a.id != id && &a.username == username) {
                return Err(AppError::DuplicateAccount);
            }
        }
        let Some(account) = store.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            account.username = username;
        }
        if let Some(email) = changes.email {
            account.email = Some(email);
        }
        if let Some(password_hash) = changes.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(role) = changes.role {
            account.role = role;
        }
        Ok(Some(account.clone()))
    }

    async fn delete_account(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.accounts.len();
        store.accounts.retain(|a| a.id != id);
        if store.accounts.len() == before {
            return Ok(false);
        }
        let mut affected: Vec<i32> = store
            .reviews
            .iter()
            .filter(|r| r.user_id == id)
            .map(|r| r.restaurant_id)
            .collect();
        affected.sort_unstable();
        affected.dedup();
        store.reviews.retain(|r| r.user_id != id);
        for restaurant_id in affected {
            store.refresh_average(restaurant_id);
        }
        Ok(true)
    }

    async fn create_restaurant(&self, req: CreateRestaurantRequest) -> AppResult<Restaurant> {
        let mut store = self.store.lock().unwrap();
        let restaurant = Restaurant {
            id: store.next_id(),
            name: req.name,
            phone_number: req.phone_number,
            address: req.address,
            average_rating: 0.0,
        };
        store.restaurants.push(restaurant.clone());
        Ok(restaurant)
    }

    async fn list_restaurants(&self, skip: i64, take: i64) -> AppResult<(Vec<Restaurant>, i64)> {
        let store = self.store.lock().unwrap();
        Ok(window(&store.restaurants, skip, take))
    }

    async fn get_restaurant(&self, id: i32) -> AppResult<Option<Restaurant>> {
        let store = self.store.lock().unwrap();
        Ok(store.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn update_restaurant(
        &self,
        id: i32,
        req: UpdateRestaurantRequest,
    ) -> AppResult<Option<Restaurant>> {
        let mut store = self.store.lock().unwrap();
        let Some(restaurant) = store.restaurants.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            restaurant.name = name;
        }
        if let Some(phone_number) = req.phone_number {
            restaurant.phone_number = phone_number;
        }
        if let Some(address) = req.address {
            restaurant.address = address;
        }
        Ok(Some(restaurant.clone()))
    }

    async fn delete_restaurant(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.restaurants.len();
        store.restaurants.retain(|r| r.id != id);
        store.reviews.retain(|r| r.restaurant_id != id);
        Ok(store.restaurants.len() != before)
    }

    async fn create_review(&self, req: CreateReviewRequest) -> AppResult<Review> {
        let mut store = self.store.lock().unwrap();
        if !store.restaurants.iter().any(|r| r.id == req.restaurant_id) {
            return Err(AppError::NotFound("Restaurant not found".to_string()));
        }
        if !store.accounts.iter().any(|a| a.id == req.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let review = Review {
            id: store.next_id(),
            rating: req.rating,
            comment: req.comment,
            created_at: Utc::now(),
            restaurant_id: req.restaurant_id,
            user_id: req.user_id,
        };
        store.reviews.push(review.clone());
        store.refresh_average(review.restaurant_id);
        Ok(review)
    }

    async fn list_reviews(&self, skip: i64, take: i64) -> AppResult<(Vec<Review>, i64)> {
        let store = self.store.lock().unwrap();
        Ok(window(&store.reviews, skip, take))
    }

    async fn list_reviews_for_restaurant(
        &self,
        restaurant_id: i32,
        skip: i64,
        take: i64,
    ) -> AppResult<(Vec<Review>, i64)> {
        let store = self.store.lock().unwrap();
        let mut matching: Vec<Review> = store
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(window(&matching, skip, take))
    }

    async fn get_review(&self, id: i32) -> AppResult<Option<Review>> {
        let store = self.store.lock().unwrap();
        Ok(store.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn update_review(&self, id: i32, req: UpdateReviewRequest) -> AppResult<Option<Review>> {
        let mut store = self.store.lock().unwrap();
        let Some(review) = store.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(rating) = req.rating {
            review.rating = rating;
        }
        if let Some(comment) = req.comment {
            review.comment = comment;
        }
        let updated = review.clone();
        store.refresh_average(updated.restaurant_id);
        Ok(Some(updated))
    }

    async fn delete_review(&self, id: i32) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let Some(position) = store.reviews.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = store.reviews.remove(position);
        store.refresh_average(removed.restaurant_id);
        Ok(true)
    }
}

// --- STATE AND REQUEST HELPERS ---

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let hasher = Arc::new(BcryptHasher::new(4)) as HasherState;
        let state = AppState::new(repo.clone() as RepositoryState, hasher, AppConfig::default())
            .expect("default config has a signing key");
        Self { state, repo }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Creates an account directly through the auth service, bypassing HTTP.
    pub async fn account(&self, username: &str, password: &str, role: Role) -> Account {
        self.state
            .auth()
            .create_account(username.to_string(), None, password, role)
            .await
            .expect("seed account")
    }

    /// A valid bearer header value for `account`.
    pub fn bearer(&self, account: &Account) -> String {
        let issued = self
            .state
            .tokens
            .issue(&SessionSubject::from(account))
            .expect("issue token");
        format!("Bearer {}", issued.token)
    }

    pub async fn restaurant(&self, name: &str) -> Restaurant {
        self.repo
            .create_restaurant(CreateRestaurantRequest {
                name: name.to_string(),
                phone_number: "555-0000".to_string(),
                address: "1 Test Street".to_string(),
            })
            .await
            .expect("seed restaurant")
    }

    pub async fn review(&self, restaurant: &Restaurant, author: &Account, rating: f64) -> Review {
        self.repo
            .create_review(CreateReviewRequest {
                rating,
                comment: "seeded".to_string(),
                restaurant_id: restaurant.id,
                user_id: author.id,
            })
            .await
            .expect("seed review")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.expect("router is infallible")
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
