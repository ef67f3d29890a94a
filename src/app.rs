use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Extension, Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{
        auth::JwtSecret,
        roles::{self, require_roles},
    },
    routes::{
        appointments, auth, blog, clinical, contact, crm, health, packages, patient_portal,
        patients, sms_settings, testimonials, therapist_portal, therapists, users,
    },
    AppState,
};

/// Origins allowed by CORS: the site itself, its subdomains and local development.
pub fn origin_allowed(origin: &str, base_url: &str) -> bool {
    for local in ["http://localhost", "http://127.0.0.1"] {
        if let Some(rest) = origin.strip_prefix(local) {
            if rest.is_empty() || rest.starts_with(':') {
                return true;
            }
        }
    }
    if origin == base_url {
        return true;
    }
    // Subdomain match: allow *.domain of the base URL
    if let Some(idx) = base_url.find("://") {
        let after_scheme = &base_url[idx + 3..];
        let domain = after_scheme.split('/').next().unwrap_or(after_scheme);
        let domain = domain.split(':').next().unwrap_or(domain);
        if !domain.is_empty() && origin.ends_with(&format!(".{domain}")) {
            return true;
        }
    }
    false
}

fn cors_layer(base_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| origin_allowed(o, &base_url))
                .unwrap_or(false)
        }))
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/otp/send", post(auth::send_code))
        .route("/api/auth/otp/verify", post(auth::verify_code))
        // Website
        .route("/api/blog", get(blog::list_published))
        .route("/api/blog/{slug}", get(blog::get_post))
        .route("/api/testimonials", get(testimonials::list_approved).post(testimonials::submit))
        .route("/api/team", get(therapists::list_team))
        .route("/api/packages", get(packages::list_active))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/appointments", post(appointments::request_appointment));

    let account = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route_layer(from_fn_with_state(roles::ANY_USER, require_roles));

    let admin = Router::new()
        .route("/api/admin/contact-messages", get(contact::list_messages))
        .route("/api/admin/contact-messages/{id}", delete(contact::delete_message))
        .route("/api/admin/contact-messages/{id}/read", post(contact::mark_read))
        .route("/api/admin/blog", get(blog::list_all).post(blog::create_post))
        .route("/api/admin/blog/{id}", put(blog::update_post).delete(blog::delete_post))
        .route("/api/admin/testimonials", get(testimonials::list_all))
        .route("/api/admin/testimonials/{id}", put(testimonials::update).delete(testimonials::delete))
        .route("/api/admin/therapists", get(therapists::list_therapists).post(therapists::create_therapist))
        .route("/api/admin/therapists/{id}", put(therapists::update_therapist).delete(therapists::delete_therapist))
        .route("/api/admin/packages", get(packages::list_packages).post(packages::create_package))
        .route("/api/admin/packages/{id}", put(packages::update_package).delete(packages::delete_package))
        .route("/api/admin/users", get(users::list_users).post(users::create_user))
        .route("/api/admin/users/{id}", put(users::update_user).delete(users::delete_user))
        .route("/api/admin/sms-settings", get(sms_settings::get_settings).put(sms_settings::update_settings))
        .route("/api/admin/sms-settings/test", post(sms_settings::send_test))
        .route_layer(from_fn_with_state(roles::ADMIN, require_roles));

    // Reception desk: appointment requests, patient registry, sales, CRM
    let front_desk = Router::new()
        .route("/api/admin/appointments", get(appointments::list_appointments))
        .route("/api/admin/appointments/{id}", put(appointments::update_appointment).delete(appointments::delete_appointment))
        .route("/api/admin/patients", get(patients::list_patients).post(patients::create_patient))
        .route(
            "/api/admin/patients/{id}",
            get(patients::get_patient).put(patients::update_patient).delete(patients::delete_patient),
        )
        .route("/api/admin/purchases", get(packages::list_purchases).post(packages::create_purchase))
        .route("/api/admin/purchases/{id}", put(packages::update_purchase).delete(packages::delete_purchase))
        .route("/api/crm/funnel", get(crm::funnel))
        .route("/api/crm/patients/{id}/status", put(crm::set_lead_status))
        .route_layer(from_fn_with_state(roles::FRONT_DESK, require_roles));

    let clinical = Router::new()
        .route("/api/clinical/treatment-plans", get(clinical::list_plans).post(clinical::create_plan))
        .route("/api/clinical/treatment-plans/{id}", put(clinical::update_plan).delete(clinical::delete_plan))
        .route("/api/clinical/session-notes", get(clinical::list_notes).post(clinical::create_note))
        .route("/api/clinical/session-notes/{id}", delete(clinical::delete_note))
        .route_layer(from_fn_with_state(roles::CLINICAL, require_roles));

    let therapist = Router::new()
        .route("/api/therapist/profile", get(therapist_portal::profile))
        .route("/api/therapist/patients", get(therapist_portal::patients))
        .route("/api/therapist/session-notes", get(therapist_portal::session_notes))
        .route_layer(from_fn_with_state(roles::THERAPIST, require_roles));

    let patient = Router::new()
        .route("/api/patient/profile", get(patient_portal::profile))
        .route("/api/patient/purchases", get(patient_portal::purchases))
        .route("/api/patient/treatment-plans", get(patient_portal::treatment_plans))
        .route("/api/patient/session-notes", get(patient_portal::session_notes))
        .route_layer(from_fn_with_state(roles::PATIENT, require_roles));

    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .merge(public)
        .merge(account)
        .merge(admin)
        .merge(front_desk)
        .merge(clinical)
        .merge(therapist)
        .merge(patient)
        .layer(Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.config.app_base_url.clone()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_site_subdomains_and_localhost() {
        let base = "https://fizyoklinik.com.tr";
        assert!(origin_allowed("https://fizyoklinik.com.tr", base));
        assert!(origin_allowed("https://www.fizyoklinik.com.tr", base));
        assert!(origin_allowed("http://localhost:3000", base));
        assert!(!origin_allowed("https://evil.com", base));
        assert!(!origin_allowed("https://fizyoklinik.com.tr.evil.com", base));
        assert!(origin_allowed("http://localhost", base));
        assert!(origin_allowed("http://127.0.0.1:5173", base));
        assert!(!origin_allowed("http://localhost.evil.com", base));
        assert!(!origin_allowed("http://127.0.0.1.nip.io", base));
    }
}
