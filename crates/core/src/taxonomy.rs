//! Module taxonomy: keyword scoring, synonym normalization, subject hints.
//!
//! A module is the product area a ticket is about. The classifier service
//! reports a free-text `category`; the oracle scores the ticket text against
//! a fixed keyword table. Both sides are folded onto the same canonical set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::OracleError;

// ── Module ───────────────────────────────────────────────────────────────────

/// A canonical product module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Orders,
    Builder,
    Products,
    Payments,
    Billing,
    Shipping,
    Settings,
    Apps,
    Customers,
    Inventory,
    Pos,
    Auth,
    Notifications,
    Technical,
    General,
}

impl Module {
    pub const ALL: [Module; 15] = [
        Module::Orders,
        Module::Builder,
        Module::Products,
        Module::Payments,
        Module::Billing,
        Module::Shipping,
        Module::Settings,
        Module::Apps,
        Module::Customers,
        Module::Inventory,
        Module::Pos,
        Module::Auth,
        Module::Notifications,
        Module::Technical,
        Module::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Orders => "orders",
            Module::Builder => "builder",
            Module::Products => "products",
            Module::Payments => "payments",
            Module::Billing => "billing",
            Module::Shipping => "shipping",
            Module::Settings => "settings",
            Module::Apps => "apps",
            Module::Customers => "customers",
            Module::Inventory => "inventory",
            Module::Pos => "pos",
            Module::Auth => "auth",
            Module::Notifications => "notifications",
            Module::Technical => "technical",
            Module::General => "general",
        }
    }

    /// Exact canonical name lookup. Synonyms go through
    /// [`ModuleClassifier::normalize`].
    pub fn from_canonical(name: &str) -> Option<Self> {
        Module::ALL.iter().copied().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Built-in tables ──────────────────────────────────────────────────────────

/// Keyword table in declaration order. Order is the tie-break: on equal
/// scores the module declared first wins.
const MODULE_KEYWORDS: &[(Module, &[&str])] = &[
    (
        Module::Orders,
        &[
            "commande",
            "order",
            "annuler",
            "annulation",
            "remboursement",
            "suivi commande",
            "numéro de commande",
            "panier",
            "checkout",
            "code promo",
            "coupon",
            "retour échange",
            "échange",
        ],
    ),
    (
        Module::Builder,
        &[
            "template",
            "thème",
            "design",
            "menu",
            "navigation",
            "contenu",
            "seo",
            "header",
            "footer",
            "bannière",
            "section",
            "bloc",
            "page d'accueil",
            "accueil",
            "homepage",
            "couleur",
            "logo",
            "favicon",
            "css",
            "apparence",
            "verrouillé",
            "verrouillage",
            "builder bloqué",
            "custom code",
            "landing page",
            "landing",
        ],
    ),
    (
        Module::Products,
        &[
            "produit",
            "product",
            "sku",
            "catalogue",
            "variante",
            "variant",
            "collection",
            "catégorie",
            "image produit",
            "photo produit",
            "prix produit",
            "ajouter produit",
            "fiche produit",
        ],
    ),
    (
        Module::Payments,
        &[
            "paiement",
            "payment",
            "carte bancaire",
            "cb",
            "visa",
            "mastercard",
            "refusé paiement",
            "transaction",
            "stripe",
            "konnect",
            "flouci",
            "tpe en ligne",
        ],
    ),
    (
        Module::Billing,
        &[
            "facture tiktak",
            "abonnement",
            "forfait",
            "renouvellement",
            "plan",
            "upgrade",
            "facturation",
            "commissions tiktak",
        ],
    ),
    (
        Module::Shipping,
        &[
            "livraison",
            "livreur",
            "expédition",
            "carrier",
            "transporteur",
            "aramex",
            "mylerz",
            "douchette",
            "scanner",
            "colis",
            "manifeste",
            "frais de livraison",
            "livraison gratuite",
        ],
    ),
    (
        Module::Settings,
        &[
            "domaine",
            "domain",
            "dns",
            "ssl",
            "certificat",
            "cloudflare",
            "nom de domaine",
            "paramètre",
            "configuration",
            "réglage",
        ],
    ),
    (
        Module::Apps,
        &[
            "application",
            "module",
            "pixel",
            "facebook pixel",
            "google analytics",
            "gtm",
            "api",
            "webhook",
            "intégration",
            "shopify",
            "apps store",
        ],
    ),
    (
        Module::Customers,
        &[
            "client",
            "customer",
            "utilisateur",
            "compte client",
            "profil client",
            "réclamation client",
        ],
    ),
    (
        Module::Inventory,
        &[
            "stock",
            "inventaire",
            "rupture",
            "quantité disponible",
            "synchronisation stock",
        ],
    ),
    (
        Module::Pos,
        &[
            "pos",
            "point de vente",
            "caisse",
            "vente boutique",
            "vente physique",
            "ticket de caisse",
        ],
    ),
    (
        Module::Auth,
        &[
            "connexion",
            "login",
            "mot de passe",
            "password",
            "otp",
            "2fa",
            "session expirée",
            "réinitialiser",
            "activation compte",
        ],
    ),
    (
        Module::Notifications,
        &[
            "notification",
            "email automatique",
            "alerte",
            "email notification",
            "email transactionnel",
        ],
    ),
    (
        Module::Technical,
        &[
            "erreur 500",
            "erreur 502",
            "erreur 503",
            "erreur 504",
            "internal server error",
            "erreur serveur",
            "panne",
            "crash",
            "site down",
            "gateway timeout",
        ],
    ),
];

/// Legacy and synonym category names the service may emit.
const CATEGORY_SYNONYMS: &[(&str, Module)] = &[
    ("templates", Module::Builder),
    ("template", Module::Builder),
    ("content", Module::Builder),
    ("contents", Module::Builder),
    ("cms", Module::Builder),
    ("pages", Module::Builder),
    ("page", Module::Builder),
    ("navigation", Module::Builder),
    ("theme", Module::Builder),
    ("themes", Module::Builder),
    ("design", Module::Builder),
    ("seo", Module::Builder),
    ("domain", Module::Settings),
    ("domains", Module::Settings),
    ("dns", Module::Settings),
    ("ssl", Module::Settings),
    ("configuration", Module::Settings),
    ("config", Module::Settings),
    ("login", Module::Auth),
    ("password", Module::Auth),
    ("otp", Module::Auth),
    ("connexion", Module::Auth),
    ("2fa", Module::Auth),
    ("notification", Module::Notifications),
    ("alerte", Module::Notifications),
    ("alertes", Module::Notifications),
    ("sms", Module::Notifications),
    ("payment", Module::Payments),
    ("paiement", Module::Payments),
    ("carte", Module::Payments),
    ("transaction", Module::Payments),
    ("stripe", Module::Payments),
    ("invoice", Module::Billing),
    ("invoices", Module::Billing),
    ("facturation", Module::Billing),
    ("facture", Module::Billing),
    ("abonnement", Module::Billing),
    ("subscription", Module::Billing),
    ("order", Module::Orders),
    ("commande", Module::Orders),
    ("checkout", Module::Orders),
    ("cart", Module::Orders),
    ("panier", Module::Orders),
    ("product", Module::Products),
    ("catalog", Module::Products),
    ("catalogue", Module::Products),
    ("sku", Module::Products),
    ("category", Module::Products),
    ("categories", Module::Products),
    ("collection", Module::Products),
    ("collections", Module::Products),
    ("inventaire", Module::Inventory),
    ("stock", Module::Inventory),
    ("rupture", Module::Inventory),
    ("delivery", Module::Shipping),
    ("carrier", Module::Shipping),
    ("livraison", Module::Shipping),
    ("expédition", Module::Shipping),
    ("expedition", Module::Shipping),
    ("scanner", Module::Shipping),
    ("douchette", Module::Shipping),
    ("manifeste", Module::Shipping),
    ("colis", Module::Shipping),
    ("customer", Module::Customers),
    ("client", Module::Customers),
    ("clients", Module::Customers),
    ("utilisateur", Module::Customers),
    ("api", Module::Apps),
    ("integration", Module::Apps),
    ("app", Module::Apps),
    ("application", Module::Apps),
    ("applications", Module::Apps),
    ("module", Module::Apps),
    ("webhook", Module::Apps),
    ("pixel", Module::Apps),
    ("facebook", Module::Apps),
    ("caisse", Module::Pos),
    ("point de vente", Module::Pos),
    ("magasin", Module::Pos),
    ("bug", Module::Technical),
    ("incident", Module::Technical),
    ("crash", Module::Technical),
    ("panne", Module::Technical),
    ("support", Module::General),
    ("ticket", Module::General),
    ("réclamation", Module::General),
];

/// Help-desk subject → module hint.
const SUBJECT_MODULES: &[(&str, Module)] = &[
    ("Commande", Module::Orders),
    ("Paramétrages", Module::Settings),
    ("Page produits", Module::Products),
    ("Website builder", Module::Builder),
    ("Produits", Module::Products),
    ("Page d'accueil", Module::Builder),
    ("Navigation", Module::Builder),
    ("Applications", Module::Apps),
    ("Paiement en ligne", Module::Payments),
    ("Intégration d'un livreur", Module::Shipping),
    ("Checkout", Module::Orders),
    ("Vente", Module::Orders),
    ("Stock", Module::Inventory),
    ("Landing page", Module::Builder),
    ("Statistique", Module::Apps),
    ("Clients", Module::Customers),
    ("Attributs", Module::Products),
    ("Devis", Module::Orders),
];

// ── Classifier ───────────────────────────────────────────────────────────────

/// Result of keyword scoring: the winning module and how many distinct
/// keywords it matched. A score of zero always means [`Module::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMatch {
    pub module: Module,
    pub score: u32,
}

/// Immutable module lookup tables, built once and injected where needed.
#[derive(Debug, Clone)]
pub struct ModuleClassifier {
    keywords: Vec<(Module, Vec<String>)>,
    synonyms: BTreeMap<String, Module>,
    subjects: BTreeMap<String, Module>,
}

impl ModuleClassifier {
    /// The production tables.
    pub fn builtin() -> Self {
        ModuleClassifier {
            keywords: MODULE_KEYWORDS
                .iter()
                .map(|(m, kws)| (*m, kws.iter().map(|k| k.to_string()).collect()))
                .collect(),
            synonyms: CATEGORY_SYNONYMS
                .iter()
                .map(|(k, m)| (k.to_string(), *m))
                .collect(),
            subjects: SUBJECT_MODULES
                .iter()
                .map(|(k, m)| (k.to_string(), *m))
                .collect(),
        }
    }

    /// Build a classifier from custom tables. Keywords are lowercased;
    /// declaration order of `keywords` is the tie-break order.
    pub fn from_tables(
        keywords: Vec<(Module, Vec<String>)>,
        synonyms: BTreeMap<String, Module>,
        subjects: BTreeMap<String, Module>,
    ) -> Result<Self, OracleError> {
        if keywords.is_empty() {
            return Err(OracleError::EmptyKeywordTable);
        }
        let keywords = keywords
            .into_iter()
            .map(|(m, kws)| (m, kws.into_iter().map(|k| k.to_lowercase()).collect()))
            .collect();
        let synonyms = synonyms
            .into_iter()
            .map(|(k, m)| (k.to_lowercase(), m))
            .collect();
        Ok(ModuleClassifier {
            keywords,
            synonyms,
            subjects,
        })
    }

    /// Score every module by the number of its distinct keywords present in
    /// `text` (case-insensitive substring match) and return the best one.
    pub fn classify(&self, text: &str) -> ModuleMatch {
        let lower = text.to_lowercase();
        let mut best = ModuleMatch {
            module: Module::General,
            score: 0,
        };
        for (module, keywords) in &self.keywords {
            let score = keywords
                .iter()
                .filter(|kw| lower.contains(kw.as_str()))
                .count() as u32;
            // Strictly greater: earlier declarations keep ties.
            if score > best.score {
                best = ModuleMatch {
                    module: *module,
                    score,
                };
            }
        }
        best
    }

    /// Fold a raw category label onto the canonical module set. Empty,
    /// `unclear` and unknown labels become [`Module::General`].
    pub fn normalize(&self, raw: &str) -> Module {
        let v = raw.trim().to_lowercase();
        if v.is_empty() || v == "unclear" {
            return Module::General;
        }
        Module::from_canonical(&v)
            .or_else(|| self.synonyms.get(&v).copied())
            .unwrap_or(Module::General)
    }

    /// Module implied by the help-desk subject, or [`Module::General`].
    pub fn module_for_subject(&self, subject: &str) -> Module {
        self.subjects
            .get(subject)
            .copied()
            .unwrap_or(Module::General)
    }
}

impl Default for ModuleClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}
