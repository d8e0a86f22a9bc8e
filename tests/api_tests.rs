use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use reel_api::{
    db::MemoryFilmStore,
    routes::{create_router, AppState},
    services::FilmService,
};

fn create_test_server() -> TestServer {
    let service = FilmService::from_store(Arc::new(MemoryFilmStore::new()));
    let app = create_router(AppState::new(service));
    TestServer::new(app).unwrap()
}

fn ids(films: &[Value]) -> Vec<i64> {
    films.iter().map(|f| f["id"].as_i64().unwrap()).collect()
}

fn id_refs(ids: &[i32]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "id": id })).collect()
}

fn film_body(name: &str, year: i32, genres: &[i32], directors: &[i32]) -> Value {
    json!({
        "name": name,
        "description": format!("About {}", name),
        "releaseDate": format!("{}-06-01", year),
        "duration": 120,
        "mpa": { "id": 1 },
        "genres": id_refs(genres),
        "directors": id_refs(directors),
    })
}

async fn create(server: &TestServer, path: &str, body: Value) -> i32 {
    let response = server.post(path).json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap() as i32
}

async fn register_user(server: &TestServer, login: &str) -> i32 {
    create(
        server,
        "/users",
        json!({ "email": format!("{}@example.com", login), "login": login }),
    )
    .await
}

/// Three films; A likes {F1, F2}, B likes {F1, F2, F3}, C likes {F3}
struct Catalog {
    server: TestServer,
    films: [i32; 3],
    users: [i32; 3],
    director: i32,
}

async fn seed_catalog() -> Catalog {
    let server = create_test_server();
    let director = create(&server, "/directors", json!({ "name": "Sofia Coppola" })).await;

    let f1 = create(
        &server,
        "/films",
        film_body("Lost in Translation", 2003, &[1, 2], &[director]),
    )
    .await;
    let f2 = create(
        &server,
        "/films",
        film_body("Marie Antoinette", 2006, &[2], &[director]),
    )
    .await;
    let f3 = create(&server, "/films", film_body("Spirited Away", 2001, &[3], &[])).await;

    let a = register_user(&server, "alice").await;
    let b = register_user(&server, "bob").await;
    let c = register_user(&server, "carol").await;

    for (film, user) in [(f1, a), (f2, a), (f1, b), (f2, b), (f3, b), (f3, c)] {
        server
            .put(&format!("/films/{}/like/{}", film, user))
            .await
            .assert_status_ok();
    }

    Catalog {
        server,
        films: [f1, f2, f3],
        users: [a, b, c],
        director,
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f1c1b7e-3e6b-4f8e-9a0a-2f4b5f7c9d10";
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;
    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_list_and_get_films() {
    let Catalog { server, films, .. } = seed_catalog().await;

    let all: Vec<Value> = server.get("/films").await.json();
    assert_eq!(ids(&all), vec![1, 2, 3]);

    let response = server.get(&format!("/films/{}", films[0])).await;
    response.assert_status_ok();
    let film: Value = response.json();
    assert_eq!(film["name"], "Lost in Translation");
    assert_eq!(film["releaseDate"], "2003-06-01");
    assert_eq!(film["mpa"]["name"], "G");
    assert_eq!(film["genres"].as_array().unwrap().len(), 2);
    assert_eq!(film["directors"][0]["name"], "Sofia Coppola");
    assert_eq!(film["likes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_film_is_404() {
    let server = create_test_server();
    let response = server.get("/films/404").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_malformed_parameters_get_json_errors() {
    let server = create_test_server();

    for path in ["/films/popular?count=abc", "/films/abc", "/films/1/like/x"] {
        let response = if path.contains("/like/") {
            server.put(path).await
        } else {
            server.get(path).await
        };
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].is_string(), "{} gave {}", path, body);
    }

    let response = server
        .post("/films")
        .json(&json!({ "name": "No date" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_create_update_and_delete_film() {
    let server = create_test_server();
    let first = create(&server, "/directors", json!({ "name": "Satoshi Kon" })).await;
    let second = create(&server, "/directors", json!({ "name": "Mamoru Oshii" })).await;

    let response = server
        .post("/films")
        .json(&film_body("Paprika", 2006, &[3, 4, 3], &[first]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["genres"], json!([
        { "id": 3, "name": "Animation" },
        { "id": 4, "name": "Thriller" },
    ]));

    let fan = register_user(&server, "dreamer").await;
    server
        .put(&format!("/films/{}/like/{}", id, fan))
        .await
        .assert_status_ok();

    let mut changed = film_body("Paprika (2006)", 2006, &[2], &[second]);
    changed["id"] = json!(id);
    let response = server.put("/films").json(&changed).await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Paprika (2006)");
    assert_eq!(updated["genres"], json!([{ "id": 2, "name": "Drama" }]));
    assert_eq!(updated["directors"], json!([{ "id": second, "name": "Mamoru Oshii" }]));
    assert_eq!(updated["likes"], json!([fan]));

    server
        .delete(&format!("/films/{}", id))
        .await
        .assert_status_ok();
    server
        .get(&format!("/films/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/films/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_film_writes_are_validated() {
    let server = create_test_server();

    let mut no_duration = film_body("Short", 2000, &[], &[]);
    no_duration["duration"] = json!(0);
    server
        .post("/films")
        .json(&no_duration)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/films")
        .json(&film_body("Odd", 2000, &[99], &[]))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // update needs an id
    server
        .put("/films")
        .json(&film_body("Nobody", 2000, &[], &[]))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let mut unknown = film_body("Nobody", 2000, &[], &[]);
    unknown["id"] = json!(77);
    server
        .put("/films")
        .json(&unknown)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_user_defaults_name_to_login() {
    let server = create_test_server();

    let response = server
        .post("/users")
        .json(&json!({ "email": "ozu@example.com", "login": "ozu", "birthday": "1903-12-12" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    assert_eq!(user["name"], "ozu");
    assert_eq!(user["birthday"], "1903-12-12");

    server
        .post("/users")
        .json(&json!({ "email": "not-an-email", "login": "x" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_follow_max_overlap() {
    let Catalog {
        server,
        films: [f1, f2, f3],
        users: [a, _, c],
        ..
    } = seed_catalog().await;

    let for_a: Vec<Value> = server
        .get(&format!("/users/{}/recommendations", a))
        .await
        .json();
    assert_eq!(ids(&for_a), vec![f3 as i64]);

    let for_c: Vec<Value> = server
        .get(&format!("/users/{}/recommendations", c))
        .await
        .json();
    assert_eq!(ids(&for_c), vec![f1 as i64, f2 as i64]);
}

#[tokio::test]
async fn test_recommendations_for_user_without_likes_is_empty() {
    let catalog = seed_catalog().await;
    let lonely = register_user(&catalog.server, "lonely").await;

    let response = catalog
        .server
        .get(&format!("/users/{}/recommendations", lonely))
        .await;
    response.assert_status_ok();
    let films: Vec<Value> = response.json();
    assert!(films.is_empty());
}

#[tokio::test]
async fn test_recommendations_for_unknown_user_is_404() {
    let server = create_test_server();
    server
        .get("/users/77/recommendations")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_twice_and_unlike_missing_are_noops() {
    let Catalog {
        server,
        films: [f1, _, f3],
        users: [a, _, _],
        ..
    } = seed_catalog().await;

    server
        .put(&format!("/films/{}/like/{}", f1, a))
        .await
        .assert_status_ok();
    let film: Value = server.get(&format!("/films/{}", f1)).await.json();
    assert_eq!(film["likes"].as_array().unwrap().len(), 2);

    server
        .delete(&format!("/films/{}/like/{}", f3, a))
        .await
        .assert_status_ok();
    let film: Value = server.get(&format!("/films/{}", f3)).await.json();
    assert_eq!(film["likes"].as_array().unwrap().len(), 2);

    server
        .delete(&format!("/films/{}/like/{}", f1, a))
        .await
        .assert_status_ok();
    let film: Value = server.get(&format!("/films/{}", f1)).await.json();
    assert_eq!(film["likes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_like_for_unknown_user_or_film_is_404() {
    let catalog = seed_catalog().await;

    catalog
        .server
        .put(&format!("/films/{}/like/999", catalog.films[0]))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    catalog
        .server
        .put(&format!("/films/999/like/{}", catalog.users[0]))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_popular_ranking_and_filters() {
    let Catalog { server, .. } = seed_catalog().await;

    // every film has two likes; ties keep id order
    let films: Vec<Value> = server.get("/films/popular").await.json();
    assert_eq!(ids(&films), vec![1, 2, 3]);

    let films: Vec<Value> = server.get("/films/popular?count=1").await.json();
    assert_eq!(films.len(), 1);

    let films: Vec<Value> = server.get("/films/popular?genreId=2&year=2006").await.json();
    assert_eq!(ids(&films), vec![2]);

    server
        .get("/films/popular?count=0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_popular_orders_by_like_count() {
    let catalog = seed_catalog().await;
    let extra = register_user(&catalog.server, "extra").await;
    catalog
        .server
        .put(&format!("/films/{}/like/{}", catalog.films[2], extra))
        .await
        .assert_status_ok();

    let films: Vec<Value> = catalog.server.get("/films/popular").await.json();
    assert_eq!(ids(&films), vec![3, 1, 2]);
}

#[tokio::test]
async fn test_search_scopes() {
    let Catalog { server, .. } = seed_catalog().await;

    let films: Vec<Value> = server.get("/films/search?query=AWAY&by=title").await.json();
    assert_eq!(ids(&films), vec![3]);

    let films: Vec<Value> = server.get("/films/search?query=coppola&by=title").await.json();
    assert!(films.is_empty());

    let films: Vec<Value> = server
        .get("/films/search?query=coppola&by=director,title")
        .await
        .json();
    assert_eq!(ids(&films), vec![2, 1]);

    let films: Vec<Value> = server.get("/films/search?query=").await.json();
    assert_eq!(ids(&films), vec![3, 2, 1]);

    server
        .get("/films/search?query=x&by=actor")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_films_by_director() {
    let Catalog {
        server, director, ..
    } = seed_catalog().await;

    let films: Vec<Value> = server
        .get(&format!("/films/director/{}?sortBy=year", director))
        .await
        .json();
    assert_eq!(ids(&films), vec![1, 2]);

    server
        .get(&format!("/films/director/{}?sortBy=rating", director))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/films/director/999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_common_films() {
    let Catalog {
        server,
        users: [a, b, c],
        ..
    } = seed_catalog().await;

    let films: Vec<Value> = server
        .get(&format!("/films/common?userId={}&friendId={}", a, b))
        .await
        .json();
    assert_eq!(ids(&films), vec![1, 2]);

    let films: Vec<Value> = server
        .get(&format!("/films/common?userId={}&friendId={}", a, c))
        .await
        .json();
    assert!(films.is_empty());
}
