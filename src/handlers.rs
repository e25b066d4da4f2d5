use crate::{
    AppState,
    auth::{AuthService, AuthUser},
    error::{AppError, AppResult},
    extract::{PathParam, QueryParams, ValidatedJson},
    models::{
        Account, AccountChanges, AccountView, CreateRestaurantRequest, CreateReviewRequest,
        CreateUserRequest, LoginRequest, LoginResponse, Restaurant, Review, SignupRequest,
        UpdateRestaurantRequest, UpdateReviewRequest, UpdateUserRequest,
    },
    pagination::{Page, PageQuery},
};
use axum::{Json, extract::State, http::StatusCode};

// --- Shared helpers ---

fn user_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("User with ID {id} not found"))
}

fn restaurant_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Restaurant with id {id} not found"))
}

fn review_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Review with id {id} not found"))
}

/// Applies a validated update to an account, re-hashing a new password first.
async fn apply_account_update(
    state: &AppState,
    id: i32,
    req: UpdateUserRequest,
) -> AppResult<Account> {
    let password_hash = match req.password.as_deref() {
        Some(password) => Some(state.auth().hash_password(password).await?),
        None => None,
    };

    let changes = AccountChanges {
        username: req.username,
        email: req.email,
        password_hash,
        role: req.role,
    };

    state
        .repo
        .update_account(id, changes)
        .await?
        .ok_or_else(|| user_not_found(id))
}

// --- Authentication ---

/// login
///
/// [Public Route] Exchanges a username and password for a signed session token.
/// An unknown username and a wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Malformed input"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let session = auth.login(&payload.username, &payload.password).await?;
    Ok(Json(LoginResponse { payload: session }))
}

/// signup
///
/// [Public Route] Registers a new account with the `user` role. Returns the account
/// summary; the caller logs in separately to obtain a token.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registered", body = AccountView),
        (status = 400, description = "Malformed input"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn signup(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<AccountView>)> {
    let account = auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

// --- Self-service ---

/// get_me
///
/// [Self-Service Route] The caller's own profile. `self_gate` has already checked that the
/// `id` query parameter names the token's subject, so the id is taken from the token.
#[utoipa::path(
    get,
    path = "/users/me",
    params(crate::access::OwnerQuery),
    responses(
        (status = 200, description = "Profile", body = AccountView),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the owner")
    )
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<AccountView>> {
    let account = state
        .repo
        .find_account(user.id)
        .await?
        .ok_or_else(|| user_not_found(user.id))?;
    Ok(Json(account.into()))
}

/// update_me
///
/// [Self-Service Route] Updates the caller's own profile. Changing one's own role is
/// forbidden.
#[utoipa::path(
    put,
    path = "/users/me",
    params(crate::access::OwnerQuery),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = AccountView),
        (status = 403, description = "Not the owner, or role change attempted"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<AccountView>> {
    let current = state
        .repo
        .find_account(user.id)
        .await?
        .ok_or_else(|| user_not_found(user.id))?;

    if payload.role.is_some_and(|role| role != current.role) {
        return Err(AppError::Forbidden);
    }

    let account = apply_account_update(&state, user.id, payload).await?;
    Ok(Json(account.into()))
}

// --- Account administration ---

/// create_user
///
/// [Admin Route] Creates an account with an explicit role (defaults to `user`).
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = AccountView),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_user(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<AccountView>)> {
    let account = auth
        .create_account(
            payload.username,
            payload.email,
            &payload.password,
            payload.role.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

#[utoipa::path(
    get,
    path = "/users",
    params(PageQuery),
    responses((status = 200, description = "Accounts", body = Page<AccountView>))
)]
pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> AppResult<Json<Page<AccountView>>> {
    let (_, take) = query.resolve();
    let (items, total) = state.repo.list_accounts(query.offset(), take).await?;
    Ok(Json(Page::new(items, total, query).map(AccountView::from)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Found", body = AccountView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<AccountView>> {
    let account = state
        .repo
        .find_account(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(account.into()))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "Account ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = AccountView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<AccountView>> {
    let account = apply_account_update(&state, id, payload).await?;
    Ok(Json(account.into()))
}

/// delete_user
///
/// [Admin Route] Deletes an account together with every review it authored.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> AppResult<StatusCode> {
    if state.repo.delete_account(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found(id))
    }
}

// --- Restaurants ---

#[utoipa::path(
    post,
    path = "/restaurants",
    request_body = CreateRestaurantRequest,
    responses((status = 201, description = "Created", body = Restaurant))
)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateRestaurantRequest>,
) -> AppResult<(StatusCode, Json<Restaurant>)> {
    let restaurant = state.repo.create_restaurant(payload).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// list_restaurants
///
/// [Public Route] Paginated restaurant listing, ordered by id.
#[utoipa::path(
    get,
    path = "/restaurants",
    params(PageQuery),
    responses((status = 200, description = "Restaurants", body = Page<Restaurant>))
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> AppResult<Json<Page<Restaurant>>> {
    let (_, take) = query.resolve();
    let (items, total) = state.repo.list_restaurants(query.offset(), take).await?;
    Ok(Json(Page::new(items, total, query)))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Found", body = Restaurant),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Restaurant>> {
    state
        .repo
        .get_restaurant(id)
        .await?
        .map(Json)
        .ok_or_else(|| restaurant_not_found(id))
}

#[utoipa::path(
    put,
    path = "/restaurants/{id}",
    params(("id" = i32, Path, description = "Restaurant ID")),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Updated", body = Restaurant),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_restaurant(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateRestaurantRequest>,
) -> AppResult<Json<Restaurant>> {
    state
        .repo
        .update_restaurant(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| restaurant_not_found(id))
}

/// delete_restaurant
///
/// [Admin Route] Removes a restaurant and its reviews.
#[utoipa::path(
    delete,
    path = "/restaurants/{id}",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<StatusCode> {
    if state.repo.delete_restaurant(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(restaurant_not_found(id))
    }
}

/// list_restaurant_reviews
///
/// [Public Route] Reviews of one restaurant, newest first.
#[utoipa::path(
    get,
    path = "/restaurants/{id}/reviews",
    params(("id" = i32, Path, description = "Restaurant ID"), PageQuery),
    responses(
        (status = 200, description = "Reviews", body = Page<Review>),
        (status = 404, description = "Restaurant not found")
    )
)]
pub async fn list_restaurant_reviews(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    QueryParams(query): QueryParams<PageQuery>,
) -> AppResult<Json<Page<Review>>> {
    if state.repo.get_restaurant(id).await?.is_none() {
        return Err(restaurant_not_found(id));
    }

    let (_, take) = query.resolve();
    let (items, total) = state
        .repo
        .list_reviews_for_restaurant(id, query.offset(), take)
        .await?;
    Ok(Json(Page::new(items, total, query)))
}

// --- Reviews ---

/// create_review
///
/// [Member Route] Posts a review. A regular user may only post as themselves; an admin
/// may post on behalf of any account. The restaurant and the account must exist.
#[utoipa::path(
    post,
    path = "/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 403, description = "Posting as another user"),
        (status = 404, description = "Restaurant or user not found")
    )
)]
pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    if !user.is_admin() && payload.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    if state.repo.get_restaurant(payload.restaurant_id).await?.is_none() {
        return Err(restaurant_not_found(payload.restaurant_id));
    }
    if state.repo.find_account(payload.user_id).await?.is_none() {
        return Err(user_not_found(payload.user_id));
    }

    let review = state.repo.create_review(payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/reviews",
    params(PageQuery),
    responses((status = 200, description = "Reviews", body = Page<Review>))
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> AppResult<Json<Page<Review>>> {
    let (_, take) = query.resolve();
    let (items, total) = state.repo.list_reviews(query.offset(), take).await?;
    Ok(Json(Page::new(items, total, query)))
}

#[utoipa::path(
    get,
    path = "/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Found", body = Review),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_review(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> AppResult<Json<Review>> {
    state
        .repo
        .get_review(id)
        .await?
        .map(Json)
        .ok_or_else(|| review_not_found(id))
}

/// update_review
///
/// [Member Route] Only the review's author may edit it; this holds for admins too.
#[utoipa::path(
    put,
    path = "/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_review(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    ValidatedJson(payload): ValidatedJson<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    let review = state
        .repo
        .get_review(id)
        .await?
        .ok_or_else(|| review_not_found(id))?;

    if review.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    state
        .repo
        .update_review(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| review_not_found(id))
}

/// delete_review
///
/// [Member Route] Two tiers: an admin may delete any review (moderation), anyone else only
/// their own.
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_review(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<StatusCode> {
    let review = state
        .repo
        .get_review(id)
        .await?
        .ok_or_else(|| review_not_found(id))?;

    if !user.is_admin() && review.user_id != user.id {
        return Err(AppError::Forbidden);
    }

    if state.repo.delete_review(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(review_not_found(id))
    }
}
