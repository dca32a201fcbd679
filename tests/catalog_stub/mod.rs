use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

/// Meal id whose record lacks `strInstructions`.
#[allow(dead_code)]
pub const MALFORMED_MEAL_ID: &str = "99999";
/// Ingredient for which the stub answers HTTP 500.
#[allow(dead_code)]
pub const FAILING_INGREDIENT: &str = "boom";

pub struct CatalogStub {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalog stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/api/json/v1/1");

        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let (status, body) = respond(request.url());
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for CatalogStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond(raw_url: &str) -> (u16, Value) {
    let Ok(url) = url::Url::parse(&format!("http://stub{raw_url}")) else {
        return (400, json!({ "error": "bad url" }));
    };
    let query = url
        .query_pairs()
        .find(|(key, _)| key == "i")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    match url.path() {
        "/api/json/v1/1/list.php" if query == "list" => (
            200,
            json!({
                "meals": [
                    { "idIngredient": "2", "strIngredient": "Salmon", "strDescription": null, "strType": null },
                    { "idIngredient": "1", "strIngredient": "Chicken", "strDescription": "Bird.", "strType": null },
                    { "idIngredient": "3", "strIngredient": null, "strDescription": null, "strType": null },
                    { "idIngredient": "4", "strIngredient": "  ", "strDescription": null, "strType": null },
                    { "idIngredient": "5", "strIngredient": "Avocado", "strDescription": null, "strType": null },
                ]
            }),
        ),
        "/api/json/v1/1/filter.php" => match query.as_str() {
            "chicken_breast" => (
                200,
                json!({
                    "meals": [
                        { "strMeal": "Chicken Handi", "strMealThumb": "https://example.com/handi.jpg", "idMeal": "52795" },
                        { "strMeal": "Teriyaki Chicken Casserole", "strMealThumb": "https://example.com/teriyaki.jpg", "idMeal": "52772" },
                    ]
                }),
            ),
            FAILING_INGREDIENT => (500, json!({ "error": "internal" })),
            _ => (200, json!({ "meals": null })),
        },
        "/api/json/v1/1/lookup.php" => match query.as_str() {
            "52772" => (200, json!({ "meals": [teriyaki()] })),
            MALFORMED_MEAL_ID => {
                let mut record = teriyaki();
                record["idMeal"] = json!(MALFORMED_MEAL_ID);
                if let Some(obj) = record.as_object_mut() {
                    obj.remove("strInstructions");
                }
                (200, json!({ "meals": [record] }))
            }
            _ => (200, json!({ "meals": null })),
        },
        _ => (404, json!({ "error": "not found" })),
    }
}

pub fn teriyaki() -> Value {
    let mut record = json!({
        "idMeal": "52772",
        "strMeal": "Teriyaki Chicken Casserole",
        "strDrinkAlternate": null,
        "strCategory": "Chicken",
        "strArea": "Japanese",
        "strInstructions": "Preheat oven to 350 F. Spray a 9x13-inch baking pan with non-stick spray.",
        "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
        "strTags": "Meat,Casserole",
        "strYoutube": "https://www.youtube.com/watch?v=4aZr5hZXP_s",
        "strIngredient1": "soy sauce",
        "strMeasure1": "3/4 cup",
        "strIngredient2": "",
        "strMeasure2": " ",
        "strIngredient3": " brown sugar ",
        "strMeasure3": null,
        "strIngredient4": "ground ginger",
        "strMeasure4": "1/2 tsp",
    });
    if let Some(obj) = record.as_object_mut() {
        for n in 5..=20 {
            obj.insert(format!("strIngredient{n}"), Value::Null);
            obj.insert(format!("strMeasure{n}"), Value::Null);
        }
    }
    record
}
